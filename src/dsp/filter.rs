//! Biquad coefficient model
//!
//! Derives RBJ "Audio EQ Cookbook" coefficients for every supported filter
//! type and evaluates their magnitude response. The same derivation feeds
//! the live filter chain, the offline renderer and the drawn curve.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Lowest center frequency handed to the coefficient derivation
pub const MIN_FREQUENCY: f64 = 20.0;

/// Highest center frequency a band may request
pub const MAX_FREQUENCY: f64 = 20000.0;

/// Smallest Q handed to the coefficient derivation
pub const MIN_Q: f64 = 0.1;

/// Largest Q a band may request
pub const MAX_Q: f64 = 18.0;

/// Highest center frequency handed to the coefficient derivation, as a
/// fraction of the sample rate
const MAX_CENTER_FRACTION: f64 = 0.499;

/// Floor applied to |H|^2 before taking the logarithm
const MAGNITUDE_FLOOR: f64 = 1e-20;

/// Filter type for EQ bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Remove above frequency
    LowPass,
    /// Remove below frequency
    HighPass,
    /// Pass a band around the center, 0 dB peak
    BandPass,
    /// Reject a band around the center
    Notch,
    /// Bell curve boost/cut
    #[default]
    Peaking,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
}

impl FilterType {
    /// All filter types, in menu order
    pub const ALL: [FilterType; 7] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::Notch,
        FilterType::Peaking,
        FilterType::LowShelf,
        FilterType::HighShelf,
    ];

    /// Whether the gain parameter changes this filter's response
    pub fn has_gain(self) -> bool {
        matches!(
            self,
            FilterType::Peaking | FilterType::LowShelf | FilterType::HighShelf
        )
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterType::LowPass => "Low Pass",
            FilterType::HighPass => "High Pass",
            FilterType::BandPass => "Band Pass",
            FilterType::Notch => "Notch",
            FilterType::Peaking => "Peaking",
            FilterType::LowShelf => "Low Shelf",
            FilterType::HighShelf => "High Shelf",
        };
        write!(f, "{}", name)
    }
}

/// Clamp a center frequency into [20 Hz, Nyquist - margin]
///
/// The upper bound wins when the rate is too low for both to hold, so the
/// result always sits below Nyquist. NaN collapses to the lower bound.
pub fn clamp_center_frequency(frequency: f64, sample_rate: f64) -> f64 {
    let upper = sample_rate * MAX_CENTER_FRACTION;
    if !(upper > 0.0) {
        return MIN_FREQUENCY;
    }
    let lower = MIN_FREQUENCY.min(upper);
    if frequency.is_nan() {
        return lower;
    }
    frequency.clamp(lower, upper)
}

/// Clamp Q to a strictly positive range
pub fn clamp_q(q: f64) -> f64 {
    if q.is_nan() {
        return MIN_Q;
    }
    q.clamp(MIN_Q, MAX_Q)
}

/// Biquad filter coefficients
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity pass-through
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Calculate coefficients for a filter at the given sample rate
    ///
    /// Center frequency and Q are clamped first, so the result is always
    /// finite and stable.
    pub fn calculate(
        filter_type: FilterType,
        center_frequency: f64,
        q: f64,
        gain_db: f64,
        sample_rate: f64,
    ) -> Self {
        let freq = clamp_center_frequency(center_frequency, sample_rate);
        let q = clamp_q(q);
        let gain_db = if gain_db.is_finite() { gain_db } else { 0.0 };

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        Self {
            b0,
            b1,
            b2,
            a0,
            a1,
            a2,
        }
    }

    /// Coefficients divided through by a0 (a0 becomes 1)
    pub fn normalized(&self) -> Self {
        Self {
            b0: self.b0 / self.a0,
            b1: self.b1 / self.a0,
            b2: self.b2 / self.a0,
            a0: 1.0,
            a1: self.a1 / self.a0,
            a2: self.a2 / self.a0,
        }
    }

    /// Whether both poles lie strictly inside the unit circle
    ///
    /// Jury criterion for a normalized second-order denominator.
    pub fn is_stable(&self) -> bool {
        let n = self.normalized();
        n.a2.abs() < 1.0 && n.a1.abs() < 1.0 + n.a2
    }

    /// Magnitude response in dB at `frequency` Hz
    ///
    /// The query frequency is clamped into (0, Nyquist], so the result is
    /// finite for any input.
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        let nyquist = sample_rate / 2.0;
        let frequency = if frequency.is_nan() {
            MIN_FREQUENCY
        } else {
            frequency.clamp(0.0, nyquist)
        };
        let n = self.normalized();

        let w = 2.0 * PI * frequency / sample_rate;
        // z^-1 = e^{-jw}
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let numerator = n.b0 + z1 * n.b1 + z2 * n.b2;
        let denominator = 1.0 + z1 * n.a1 + z2 * n.a2;

        let power = numerator.norm_sqr() / denominator.norm_sqr().max(MAGNITUDE_FLOOR);
        10.0 * power.max(MAGNITUDE_FLOOR).log10()
    }
}

/// Coefficients for one filter, clamping parameters first
pub fn coefficients(
    filter_type: FilterType,
    center_frequency: f64,
    q: f64,
    gain_db: f64,
    sample_rate: f64,
) -> BiquadCoeffs {
    BiquadCoeffs::calculate(filter_type, center_frequency, q, gain_db, sample_rate)
}

/// Magnitude response in dB of one filter at `frequency`
///
/// Evaluated through the same coefficient derivation used for live audio.
pub fn response(
    frequency: f64,
    filter_type: FilterType,
    center_frequency: f64,
    q: f64,
    gain_db: f64,
    sample_rate: f64,
) -> f64 {
    coefficients(filter_type, center_frequency, q, gain_db, sample_rate)
        .magnitude_db(frequency, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    const FS: f64 = 48000.0;

    #[test_case(100.0, 6.0, 1.0)]
    #[test_case(1000.0, -12.0, 0.7)]
    #[test_case(5000.0, 18.0, 4.0)]
    #[test_case(12000.0, -30.0, 18.0)]
    #[test_case(40.0, 30.0, 0.1)]
    fn test_peaking_gain_at_center(freq: f64, gain: f64, q: f64) {
        let db = response(freq, FilterType::Peaking, freq, q, gain, FS);
        assert!(
            (db - gain).abs() < 0.2,
            "Peaking {} Hz / {} dB / Q {} measured {} dB",
            freq,
            gain,
            q,
            db
        );
    }

    #[test_case(FilterType::LowPass)]
    #[test_case(FilterType::HighPass)]
    #[test_case(FilterType::BandPass)]
    #[test_case(FilterType::Notch)]
    #[test_case(FilterType::Peaking)]
    #[test_case(FilterType::LowShelf)]
    #[test_case(FilterType::HighShelf)]
    fn test_out_of_range_queries_are_finite(filter_type: FilterType) {
        for query in [-100.0, 0.0, 1e-9, 23999.0, 24000.0, 96000.0, f64::NAN] {
            for center in [0.0, -5.0, 999999.0, 23999.9] {
                let db = response(query, filter_type, center, 1.0, 12.0, FS);
                assert!(
                    db.is_finite(),
                    "{} center {} query {} gave {}",
                    filter_type,
                    center,
                    query,
                    db
                );
            }
        }
    }

    #[test_case(FilterType::LowPass)]
    #[test_case(FilterType::HighPass)]
    #[test_case(FilterType::BandPass)]
    #[test_case(FilterType::Notch)]
    #[test_case(FilterType::Peaking)]
    #[test_case(FilterType::LowShelf)]
    #[test_case(FilterType::HighShelf)]
    fn test_extreme_parameters_stay_stable(filter_type: FilterType) {
        for center in [0.0, 20.0, 20000.0, 23990.0, 1e9] {
            for q in [0.0, -1.0, 1e-6, 18.0, 100.0] {
                for gain in [-30.0, 0.0, 30.0] {
                    let c = coefficients(filter_type, center, q, gain, FS);
                    assert!(c.is_stable(), "{} {} {} {} unstable", filter_type, center, q, gain);
                    let n = c.normalized();
                    assert!(n.b0.is_finite() && n.b1.is_finite() && n.b2.is_finite());
                    assert!(n.a1.is_finite() && n.a2.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_clamps_center_frequency() {
        assert_eq!(clamp_center_frequency(999999.0, 48000.0), 48000.0 * 0.499);
        assert_eq!(clamp_center_frequency(5.0, 48000.0), MIN_FREQUENCY);
        assert_eq!(clamp_center_frequency(f64::NAN, 48000.0), MIN_FREQUENCY);
        assert_eq!(clamp_q(0.0), MIN_Q);
        assert_eq!(clamp_q(50.0), MAX_Q);
    }

    #[test]
    fn test_center_stays_below_nyquist_at_tiny_rates() {
        assert_eq!(clamp_center_frequency(1000.0, 30.0), 30.0 * 0.499);
        assert_eq!(clamp_center_frequency(f64::NAN, 30.0), 30.0 * 0.499);
        for filter_type in FilterType::ALL {
            let c = coefficients(filter_type, 1000.0, 1.0, 6.0, 30.0);
            assert!(c.is_stable(), "{} unstable at 30 Hz", filter_type);
            assert!(c.magnitude_db(10.0, 30.0).is_finite());
        }
    }

    #[test]
    fn test_gain_ignored_for_pass_types() {
        for filter_type in [
            FilterType::LowPass,
            FilterType::HighPass,
            FilterType::BandPass,
            FilterType::Notch,
        ] {
            let flat = coefficients(filter_type, 1000.0, 1.0, 0.0, FS);
            let boosted = coefficients(filter_type, 1000.0, 1.0, 24.0, FS);
            assert_eq!(flat, boosted, "{} should ignore gain", filter_type);
        }
    }

    #[test]
    fn test_pass_filter_shapes() {
        // Butterworth Q gives -3 dB at the corner
        let lp = coefficients(FilterType::LowPass, 1000.0, std::f64::consts::FRAC_1_SQRT_2, 0.0, FS);
        assert_abs_diff_eq!(lp.magnitude_db(1000.0, FS), -3.01, epsilon = 0.05);
        assert_abs_diff_eq!(lp.magnitude_db(20.0, FS), 0.0, epsilon = 0.01);
        assert!(lp.magnitude_db(10000.0, FS) < -35.0);

        let hp = coefficients(FilterType::HighPass, 1000.0, std::f64::consts::FRAC_1_SQRT_2, 0.0, FS);
        assert!(hp.magnitude_db(50.0, FS) < -45.0);
        assert_abs_diff_eq!(hp.magnitude_db(15000.0, FS), 0.0, epsilon = 0.05);

        let bp = coefficients(FilterType::BandPass, 2000.0, 2.0, 0.0, FS);
        assert_abs_diff_eq!(bp.magnitude_db(2000.0, FS), 0.0, epsilon = 0.01);
        assert!(bp.magnitude_db(200.0, FS) < -15.0);

        let notch = coefficients(FilterType::Notch, 2000.0, 2.0, 0.0, FS);
        assert!(notch.magnitude_db(2000.0, FS) < -100.0);
        assert_abs_diff_eq!(notch.magnitude_db(100.0, FS), 0.0, epsilon = 0.05);
    }

    #[test]
    fn test_shelves_are_mirror_images() {
        let low = coefficients(FilterType::LowShelf, 1000.0, 0.707, 9.0, FS);
        let high = coefficients(FilterType::HighShelf, 1000.0, 0.707, 9.0, FS);

        assert_abs_diff_eq!(low.magnitude_db(20.0, FS), 9.0, epsilon = 0.1);
        assert_abs_diff_eq!(low.magnitude_db(20000.0, FS), 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(high.magnitude_db(20.0, FS), 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(high.magnitude_db(20000.0, FS), 9.0, epsilon = 0.2);

        // Both sit at half gain at the corner
        assert_abs_diff_eq!(low.magnitude_db(1000.0, FS), 4.5, epsilon = 0.1);
        assert_abs_diff_eq!(high.magnitude_db(1000.0, FS), 4.5, epsilon = 0.1);
    }

    #[test]
    fn test_identity_is_flat() {
        let id = BiquadCoeffs::identity();
        for f in [20.0, 1000.0, 20000.0] {
            assert_abs_diff_eq!(id.magnitude_db(f, FS), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_filter_type_serde_names() {
        let json = serde_json::to_string(&FilterType::HighShelf).unwrap();
        assert_eq!(json, "\"high_shelf\"");
        let parsed: FilterType = serde_json::from_str("\"band_pass\"").unwrap();
        assert_eq!(parsed, FilterType::BandPass);
    }
}
