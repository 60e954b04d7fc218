//! Running biquad filter
//!
//! Applies one set of coefficients to every channel of a buffer, keeping
//! independent history per channel.

use super::filter::BiquadCoeffs;

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Direct Form I, coefficients already normalized by a0
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// A biquad applied uniformly across channels
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl Biquad {
    /// Create a filter from raw (un-normalized) coefficients
    pub fn new(coeffs: BiquadCoeffs, num_channels: usize) -> Self {
        Self {
            coeffs: coeffs.normalized(),
            states: vec![BiquadState::default(); num_channels],
        }
    }

    /// Normalized coefficients in use
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Number of channels this filter keeps history for
    pub fn num_channels(&self) -> usize {
        self.states.len()
    }

    /// Grow or shrink per-channel history; new channels start silent
    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.states.resize(num_channels, BiquadState::default());
    }

    /// Filter one channel's samples in place
    pub fn process_channel(&mut self, channel: usize, samples: &mut [f32]) {
        let Some(state) = self.states.get_mut(channel) else {
            return;
        };
        for sample in samples.iter_mut() {
            *sample = state.process(*sample as f64, &self.coeffs) as f32;
        }
    }

    /// Clear filter history on every channel
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = BiquadState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::{coefficients, FilterType};

    #[test]
    fn test_identity_passthrough() {
        let mut filter = Biquad::new(BiquadCoeffs::identity(), 1);
        let mut samples = vec![0.25, -0.5, 1.0, 0.0];
        let original = samples.clone();
        filter.process_channel(0, &mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_channels_are_independent() {
        let coeffs = coefficients(FilterType::LowPass, 500.0, 0.707, 0.0, 48000.0);
        let mut filter = Biquad::new(coeffs, 2);

        let mut left = vec![1.0; 64];
        let mut right = vec![0.0; 64];
        filter.process_channel(0, &mut left);
        filter.process_channel(1, &mut right);

        assert!(left.iter().any(|&s| s != 0.0));
        assert!(right.iter().all(|&s| s == 0.0), "Silence must stay silent");
    }

    #[test]
    fn test_out_of_range_channel_is_ignored() {
        let mut filter = Biquad::new(BiquadCoeffs::identity(), 1);
        let mut samples = vec![0.5; 4];
        filter.process_channel(3, &mut samples);
        assert_eq!(samples, vec![0.5; 4]);
    }

    #[test]
    fn test_reset_clears_history() {
        let coeffs = coefficients(FilterType::Peaking, 1000.0, 1.0, 12.0, 48000.0);
        let mut filter = Biquad::new(coeffs, 1);

        let mut first = vec![0.3; 32];
        filter.process_channel(0, &mut first);
        filter.reset();

        let mut second = vec![0.3; 32];
        filter.process_channel(0, &mut second);
        assert_eq!(first, second, "After reset, output must match a fresh filter");
    }
}
