//! Measurement taps
//!
//! A tap keeps the most recent window of a graph point (downmixed to mono)
//! for meters and spectrum displays. The render path writes it, any thread
//! may read it; readers only ever see whole blocks.

use std::sync::Arc;

use parking_lot::RwLock;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use super::buffer::{linear_to_db, peak_db, rms_db, AudioBuffer};

/// Spectrum floor in dB, reported for empty bins
pub const SPECTRUM_FLOOR_DB: f32 = -120.0;

/// Read-only window onto one point of the live graph
pub struct MeasurementTap {
    window: RwLock<Vec<f32>>,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    sample_rate: u32,
}

impl MeasurementTap {
    /// Create a tap holding `fft_size` samples (rounded up to a power of two)
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        let fft_size = fft_size.max(2).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Self {
            window: RwLock::new(vec![0.0; fft_size]),
            fft,
            fft_size,
            sample_rate,
        }
    }

    /// Window length in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Sample rate of the tapped signal
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Push a rendered block into the window, averaging its channels
    pub(crate) fn capture(&self, block: &AudioBuffer) {
        let num_channels = block.num_channels();
        let frames = block.num_frames();
        if num_channels == 0 || frames == 0 {
            return;
        }

        let scale = 1.0 / num_channels as f32;
        let take = frames.min(self.fft_size);
        let skip = frames - take;
        let start = self.fft_size - take;

        let mut window = self.window.write();
        window.rotate_left(take);
        for (i, slot) in window[start..].iter_mut().enumerate() {
            let frame = skip + i;
            *slot = block
                .samples
                .iter()
                .map(|c| c.get(frame).copied().unwrap_or(0.0))
                .sum::<f32>()
                * scale;
        }
    }

    /// Clear the window (source stopped)
    pub(crate) fn clear(&self) {
        self.window.write().fill(0.0);
    }

    /// Copy of the current window, oldest sample first
    pub fn time_domain(&self) -> Vec<f32> {
        self.window.read().clone()
    }

    /// RMS level of the window in dBFS
    pub fn rms_db(&self) -> f32 {
        rms_db(&self.window.read())
    }

    /// Peak level of the window in dBFS
    pub fn peak_db(&self) -> f32 {
        peak_db(&self.window.read())
    }

    /// Hann-windowed magnitude spectrum in dBFS, `fft_size / 2` bins
    pub fn frequency_data(&self) -> Vec<f32> {
        let n = self.fft_size;
        let mut spectrum: Vec<Complex32> = {
            let window = self.window.read();
            window
                .iter()
                .enumerate()
                .map(|(i, &s)| {
                    let hann = 0.5
                        - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos();
                    Complex32::new(s * hann, 0.0)
                })
                .collect()
        };
        self.fft.process(&mut spectrum);

        // Hann coherent gain is 0.5, so a full-scale sine reads 0 dB
        let scale = 4.0 / n as f32;
        spectrum[..n / 2]
            .iter()
            .map(|bin| {
                let magnitude = bin.norm() * scale;
                if magnitude > 0.0 {
                    linear_to_db(magnitude).max(SPECTRUM_FLOOR_DB)
                } else {
                    SPECTRUM_FLOOR_DB
                }
            })
            .collect()
    }

    /// Center frequency of spectrum bin `index`
    pub fn bin_frequency(&self, index: usize) -> f64 {
        index as f64 * self.sample_rate as f64 / self.fft_size as f64
    }
}

impl std::fmt::Debug for MeasurementTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementTap")
            .field("fft_size", &self.fft_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
