//! Engine configuration
//!
//! Loaded from JSON; every field has a default, and out-of-range values are
//! clamped with a warning instead of rejected.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::Waveform;
use crate::error::Result;

/// Processing sample rate used when nothing else dictates one
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Runtime configuration for the live graph and preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Live processing sample rate in Hz
    pub sample_rate: u32,
    /// Rate for drawing the response curve; follows `sample_rate` when
    /// absent. An explicit value makes the drawn curve differ from the
    /// audible chain near Nyquist.
    pub preview_sample_rate: Option<u32>,
    /// Channels rendered by the live graph
    pub output_channels: usize,
    /// Frames per render callback
    pub block_size: usize,
    /// Length of the looped noise buffer in seconds
    pub noise_duration_secs: f64,
    /// Fixed seed for the noise buffer; random when absent
    pub noise_seed: Option<u64>,
    /// Test tone waveform
    pub oscillator_waveform: Waveform,
    /// Test tone frequency in Hz
    pub oscillator_frequency: f64,
    /// Test tone amplitude (0 to 1)
    pub oscillator_amplitude: f32,
    /// FFT size used by measurement taps (power of two)
    pub analyser_fft_size: usize,
    /// Whether file playback wraps at the end
    pub loop_file: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            preview_sample_rate: None,
            output_channels: 2,
            block_size: 512,
            noise_duration_secs: 2.0,
            noise_seed: None,
            oscillator_waveform: Waveform::Sine,
            oscillator_frequency: 440.0,
            oscillator_amplitude: 0.5,
            analyser_fft_size: 2048,
            loop_file: true,
        }
    }
}

impl EngineConfig {
    /// Read configuration from a JSON file and clamp it
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        Ok(config.validated())
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Copy with every field clamped into a usable range
    pub fn validated(&self) -> Self {
        let mut config = self.clone();

        config.sample_rate = clamp_logged("sample_rate", self.sample_rate, 8000, 192000);
        config.preview_sample_rate = self
            .preview_sample_rate
            .map(|rate| clamp_logged("preview_sample_rate", rate, 8000, 192000));
        config.output_channels = clamp_logged("output_channels", self.output_channels, 1, 8);
        config.block_size = clamp_logged("block_size", self.block_size, 32, 8192);
        config.analyser_fft_size = clamp_logged("analyser_fft_size", self.analyser_fft_size, 32, 32768)
            .next_power_of_two();

        let nyquist = config.sample_rate as f64 / 2.0;
        config.oscillator_frequency = clamp_logged(
            "oscillator_frequency",
            self.oscillator_frequency,
            1.0,
            nyquist - 1.0,
        );
        config.oscillator_amplitude =
            clamp_logged("oscillator_amplitude", self.oscillator_amplitude, 0.0, 1.0);
        config.noise_duration_secs =
            clamp_logged("noise_duration_secs", self.noise_duration_secs, 0.1, 30.0);

        config
    }

    /// Rate the response curve is evaluated at
    pub fn preview_rate(&self) -> u32 {
        self.preview_sample_rate.unwrap_or(self.sample_rate)
    }
}

fn clamp_logged<T: PartialOrd + Copy + std::fmt::Display>(name: &str, value: T, min: T, max: T) -> T {
    // NaN fails both comparisons and falls through to `min`
    let clamped = if value > max {
        max
    } else if value >= min {
        value
    } else {
        min
    };
    if clamped != value {
        warn!("Config {} = {} out of range, using {}", name, value, clamped);
    }
    clamped
}
