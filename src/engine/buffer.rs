//! Audio Buffer Management
//!
//! The planar float buffer shared by decoding, file playback, live blocks
//! and offline rendering.

use crate::error::{EqError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level of a sample slice in dB
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    linear_to_db((sum_squares / samples.len() as f64).sqrt() as f32)
}

/// Peak level of a sample slice in dB
pub fn peak_db(samples: &[f32]) -> f32 {
    linear_to_db(samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max))
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar 32-bit float audio
///
/// Outer Vec is channels, inner Vec is frames. Every channel is expected
/// to hold the same number of frames; `shape_error` reports when that does
/// not hold.
///
/// # Example
/// ```
/// use nueva_eq::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 48000, 48000);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_frames(), 48000);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is frames
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_frames]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel data
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a buffer from interleaved data (L, R, L, R, ...)
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(EqError::UnsupportedFormat {
                format: "0-channel audio".to_string(),
            });
        }
        if interleaved.len() % num_channels != 0 {
            return Err(EqError::Decode {
                reason: format!(
                    "Sample count {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let frames = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(frames); num_channels];
        for (i, &sample) in interleaved.iter().enumerate() {
            samples[i % num_channels].push(sample);
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Interleave channels into a single Vec
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let frames = self.num_frames();
        let mut result = Vec::with_capacity(frames * num_channels);
        for frame in 0..frames {
            for channel in &self.samples {
                result.push(channel.get(frame).copied().unwrap_or(0.0));
            }
        }
        result
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.first().map_or(0, |c| c.len())
    }

    /// Whether the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Mutable samples of one channel
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Describe why this buffer cannot be processed, if it cannot
    pub fn shape_error(&self) -> Option<String> {
        if self.samples.is_empty() {
            return Some("buffer has no channels".to_string());
        }
        if self.sample_rate == 0 {
            return Some("buffer has a sample rate of 0 Hz".to_string());
        }
        let frames = self.num_frames();
        self.samples
            .iter()
            .position(|c| c.len() != frames)
            .map(|ch| {
                format!(
                    "channel {} has {} frames, expected {}",
                    ch,
                    self.samples[ch].len(),
                    frames
                )
            })
    }

    /// Check that no sample is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().flatten().all(|s| s.is_finite())
    }

    /// Reshape to `num_channels` x `num_frames` and zero it
    ///
    /// Existing channel storage is reused, so a buffer that already has the
    /// requested shape is never reallocated.
    pub fn reshape(&mut self, num_channels: usize, num_frames: usize) {
        self.samples.resize_with(num_channels, Vec::new);
        for channel in &mut self.samples {
            channel.clear();
            channel.resize(num_frames, 0.0);
        }
    }

    /// Zero every sample
    pub fn fill_silence(&mut self) {
        for channel in &mut self.samples {
            channel.iter_mut().for_each(|s| *s = 0.0);
        }
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(2, 0, 48000)
    }
}

// ============================================================================
// Tests
// ============================================================================
