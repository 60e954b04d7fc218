//! Dynamics preview model
//!
//! Dynamic bands are previewed at the extreme of their modulation range:
//! the static magnitude shifted by `range` dB. No envelope follower runs
//! on live audio; the audible chain is always the static one.

use super::band::Band;

/// Modulation term in dB contributed by a band's dynamics
///
/// Zero unless dynamics is enabled on a gain-bearing filter type.
pub fn modulation_db(band: &Band) -> f64 {
    if !band.dynamics_active() {
        return 0.0;
    }
    band.dynamics.clamped().range
}

/// Magnitude in dB at `frequency` with dynamics applied at full depth
pub fn modulated_magnitude_db(band: &Band, frequency: f64, sample_rate: f64) -> f64 {
    band.magnitude_db(frequency, sample_rate) + modulation_db(band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::band::DynamicsSettings;
    use approx::assert_abs_diff_eq;

    fn dynamic(range: f64) -> DynamicsSettings {
        DynamicsSettings {
            enabled: true,
            range,
            ..Default::default()
        }
    }

    #[test]
    fn test_adds_range_for_gain_types() {
        let band = Band::peaking(1000.0, 6.0, 1.0).with_dynamics(dynamic(-4.0));
        let static_db = band.magnitude_db(1000.0, 48000.0);
        let modulated = modulated_magnitude_db(&band, 1000.0, 48000.0);
        assert_abs_diff_eq!(modulated, static_db - 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_modulation_when_disabled() {
        let mut settings = dynamic(-4.0);
        settings.enabled = false;
        let band = Band::low_shelf(200.0, 3.0, 0.7).with_dynamics(settings);
        assert_eq!(
            modulated_magnitude_db(&band, 100.0, 48000.0),
            band.magnitude_db(100.0, 48000.0)
        );
    }

    #[test]
    fn test_no_modulation_for_pass_types() {
        let band = Band::high_pass(200.0, 0.7).with_dynamics(dynamic(12.0));
        assert_eq!(
            modulated_magnitude_db(&band, 1000.0, 48000.0),
            band.magnitude_db(1000.0, 48000.0)
        );
    }

    #[test]
    fn test_range_is_clamped() {
        let band = Band::high_shelf(5000.0, 0.0, 0.7).with_dynamics(dynamic(-80.0));
        assert_abs_diff_eq!(
            modulated_magnitude_db(&band, 20.0, 48000.0),
            band.magnitude_db(20.0, 48000.0) - 30.0,
            epsilon = 1e-9
        );
    }
}
