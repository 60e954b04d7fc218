//! Composite frequency response
//!
//! The drawn curve is the arithmetic dB sum of every enabled band's
//! magnitude, computed from the same coefficients the live chain uses.
//! Two variants are produced: static, and with dynamics at full depth.

use serde::Serialize;

use super::band::Band;
use super::dynamics::modulation_db;
use super::filter::BiquadCoeffs;

/// Read-only snapshot of a band collection, ready for curve evaluation
///
/// Coefficients are derived once at construction; evaluating a frequency
/// never touches the live graph.
#[derive(Debug, Clone)]
pub struct ResponseEvaluator {
    sample_rate: f64,
    /// (coefficients, dynamics modulation in dB) per enabled band
    stages: Vec<(BiquadCoeffs, f64)>,
}

impl ResponseEvaluator {
    /// Snapshot the enabled bands of `bands` at `sample_rate`
    pub fn new(bands: &[Band], sample_rate: f64) -> Self {
        let stages = bands
            .iter()
            .filter(|band| band.enabled)
            .map(|band| (band.coefficients(sample_rate), modulation_db(band)))
            .collect();
        Self {
            sample_rate,
            stages,
        }
    }

    /// Reference rate the curve is evaluated at
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of enabled bands contributing to the curve
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no band contributes (the curve is flat 0 dB)
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of plain band magnitudes at `frequency`
    pub fn static_db(&self, frequency: f64) -> f64 {
        self.stages
            .iter()
            .map(|(coeffs, _)| coeffs.magnitude_db(frequency, self.sample_rate))
            .sum()
    }

    /// Sum of band magnitudes with dynamics modulation at `frequency`
    pub fn dynamic_db(&self, frequency: f64) -> f64 {
        self.stages
            .iter()
            .map(|(coeffs, modulation)| coeffs.magnitude_db(frequency, self.sample_rate) + modulation)
            .sum()
    }

    /// Whether any contributing band carries a dynamics term
    pub fn has_dynamics(&self) -> bool {
        self.stages.iter().any(|(_, modulation)| *modulation != 0.0)
    }

    /// Hand the static curve to a drawing layer as a plain function
    pub fn into_static_fn(self) -> impl Fn(f64) -> f64 + Send + Sync {
        move |frequency| self.static_db(frequency)
    }

    /// Evaluate both curves over a frequency grid
    pub fn curve(&self, frequencies: &[f64]) -> ResponseCurve {
        ResponseCurve {
            points: frequencies
                .iter()
                .map(|&frequency| ResponsePoint {
                    frequency,
                    static_db: self.static_db(frequency),
                    dynamic_db: self.dynamic_db(frequency),
                })
                .collect(),
        }
    }
}

/// One evaluated point of the composite curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponsePoint {
    pub frequency: f64,
    pub static_db: f64,
    pub dynamic_db: f64,
}

/// Composite curve over a frequency grid
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseCurve {
    pub points: Vec<ResponsePoint>,
}

impl ResponseCurve {
    /// Largest absolute static deviation from 0 dB
    pub fn max_abs_static_db(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.static_db.abs())
            .fold(0.0, f64::max)
    }
}

/// Logarithmically spaced frequencies from `min` to `max` inclusive
pub fn log_frequency_grid(points: usize, min: f64, max: f64) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let ratio = (max / min).ln();
            (0..points)
                .map(|i| min * (ratio * i as f64 / (points - 1) as f64).exp())
                .collect()
        }
    }
}

/// Static composite magnitude at `frequency` for a band collection
pub fn composite_db(bands: &[Band], frequency: f64, sample_rate: f64) -> f64 {
    ResponseEvaluator::new(bands, sample_rate).static_db(frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::band::DynamicsSettings;
    use approx::assert_abs_diff_eq;

    const FS: f64 = 48000.0;

    #[test]
    fn test_single_peaking_scenario() {
        let bands = vec![Band::peaking(1000.0, 6.0, 1.0)];
        assert_abs_diff_eq!(composite_db(&bands, 1000.0, FS), 6.0, epsilon = 0.5);
        assert_abs_diff_eq!(composite_db(&bands, 100.0, FS), 0.0, epsilon = 1.0);
        assert_abs_diff_eq!(composite_db(&bands, 10000.0, FS), 0.0, epsilon = 1.0);
    }

    #[test]
    fn test_disabled_band_is_flat() {
        let bands = vec![Band::peaking(1000.0, 6.0, 1.0).with_enabled(false)];
        for f in log_frequency_grid(32, 20.0, 20000.0) {
            assert_eq!(composite_db(&bands, f, FS), 0.0);
        }
    }

    #[test]
    fn test_sum_of_enabled_bands() {
        let bands = vec![
            Band::low_shelf(120.0, 4.0, 0.7),
            Band::peaking(900.0, -5.0, 2.0).with_enabled(false),
            Band::notch(3000.0, 4.0),
            Band::high_shelf(8000.0, -3.0, 0.7),
        ];
        let evaluator = ResponseEvaluator::new(&bands, FS);
        assert_eq!(evaluator.len(), 3);

        for f in [50.0, 440.0, 2500.0, 12000.0] {
            let expected: f64 = bands
                .iter()
                .filter(|b| b.enabled)
                .map(|b| b.magnitude_db(f, FS))
                .sum();
            assert_abs_diff_eq!(evaluator.static_db(f), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_dynamic_curve_shifts_by_range() {
        let dynamics = DynamicsSettings {
            enabled: true,
            range: 5.0,
            ..Default::default()
        };
        let bands = vec![
            Band::peaking(1000.0, -3.0, 1.0).with_dynamics(dynamics.clone()),
            Band::low_pass(15000.0, 0.7).with_dynamics(dynamics),
        ];
        let evaluator = ResponseEvaluator::new(&bands, FS);
        assert!(evaluator.has_dynamics());
        let curve = evaluator.curve(&[100.0, 1000.0]);
        for point in &curve.points {
            assert_abs_diff_eq!(point.dynamic_db - point.static_db, 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_static_fn_matches_evaluator() {
        let bands = vec![Band::peaking(2000.0, 9.0, 3.0)];
        let evaluator = ResponseEvaluator::new(&bands, FS);
        let expected = evaluator.static_db(2000.0);
        let f = evaluator.into_static_fn();
        assert_eq!(f(2000.0), expected);
    }

    #[test]
    fn test_log_grid_endpoints() {
        let grid = log_frequency_grid(10, 20.0, 20000.0);
        assert_eq!(grid.len(), 10);
        assert_abs_diff_eq!(grid[0], 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid[9], 20000.0, epsilon = 1e-6);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
        assert!(log_frequency_grid(0, 20.0, 20000.0).is_empty());
    }
}
