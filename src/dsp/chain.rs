//! Filter chain built from a band collection
//!
//! The chain is the ordered subsequence of enabled bands, in collection
//! order, each mapped to a running biquad. It is never patched: every band
//! change produces a whole new chain.

use log::{debug, warn};

use super::band::Band;
use super::biquad::Biquad;
use super::filter::BiquadCoeffs;
use crate::engine::AudioBuffer;

/// One live stage of the chain
#[derive(Debug, Clone)]
pub struct ChainStage {
    /// Id of the band this stage was built from
    pub band_id: String,
    filter: Biquad,
}

impl ChainStage {
    /// Normalized coefficients of this stage
    pub fn coeffs(&self) -> &BiquadCoeffs {
        self.filter.coeffs()
    }
}

/// Ordered chain of enabled filters
#[derive(Debug, Clone)]
pub struct FilterChain {
    stages: Vec<ChainStage>,
    sample_rate: f64,
    num_channels: usize,
}

impl FilterChain {
    /// Create an empty chain (pass-through)
    pub fn new(sample_rate: f64, num_channels: usize) -> Self {
        Self {
            stages: Vec::new(),
            sample_rate,
            num_channels,
        }
    }

    /// Build a chain from a band collection
    ///
    /// Disabled bands are skipped; out-of-range parameters are clamped.
    pub fn build(bands: &[Band], sample_rate: f64, num_channels: usize) -> Self {
        let stages = bands
            .iter()
            .filter(|band| band.enabled)
            .map(|band| {
                if band.is_out_of_range() {
                    warn!(
                        "Band {} has out-of-range parameters, clamping (freq {} Hz, gain {} dB, q {})",
                        band.id, band.frequency, band.gain, band.q
                    );
                }
                ChainStage {
                    band_id: band.id.clone(),
                    filter: Biquad::new(band.coefficients(sample_rate), num_channels),
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "Built filter chain: {} of {} bands enabled at {} Hz",
            stages.len(),
            bands.len(),
            sample_rate
        );

        Self {
            stages,
            sample_rate,
            num_channels,
        }
    }

    /// Sample rate the coefficients were derived at
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of channels each stage keeps history for
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of stages in the chain
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain passes audio through untouched
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate over stages in processing order
    pub fn stages(&self) -> impl Iterator<Item = &ChainStage> {
        self.stages.iter()
    }

    /// Band ids in processing order
    pub fn band_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.band_id.as_str()).collect()
    }

    /// Normalized coefficients in processing order
    pub fn coefficient_set(&self) -> Vec<BiquadCoeffs> {
        self.stages.iter().map(|s| *s.coeffs()).collect()
    }

    /// Combined magnitude of the chain in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f64) -> f64 {
        self.stages
            .iter()
            .map(|s| s.coeffs().magnitude_db(frequency, self.sample_rate))
            .sum()
    }

    /// Match per-channel history to a buffer's channel count
    pub fn set_num_channels(&mut self, num_channels: usize) {
        if num_channels == self.num_channels {
            return;
        }
        self.num_channels = num_channels;
        for stage in &mut self.stages {
            stage.filter.set_num_channels(num_channels);
        }
    }

    /// Process a buffer in place, stage by stage
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.set_num_channels(buffer.num_channels());
        for stage in &mut self.stages {
            for (channel, samples) in buffer.samples.iter_mut().enumerate() {
                stage.filter.process_channel(channel, samples);
            }
        }
    }

    /// Clear filter history on every stage
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.filter.reset();
        }
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(48000.0, 2)
    }
}
