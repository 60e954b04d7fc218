//! Signal sources
//!
//! Exactly one source feeds the live graph at a time. Each variant renders
//! whole blocks on the audio callback.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::buffer::AudioBuffer;
use super::device::CaptureStream;

/// Which kind of source is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Looped uniform white noise
    Noise,
    /// Fixed test tone
    Oscillator,
    /// Live capture
    Microphone,
    /// Decoded file
    File,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Noise => write!(f, "Noise"),
            SourceKind::Oscillator => write!(f, "Oscillator"),
            SourceKind::Microphone => write!(f, "Microphone"),
            SourceKind::File => write!(f, "File"),
        }
    }
}

/// Test tone shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Value at `phase` in [0, 1)
    fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// A source node on the live graph
pub trait SourceNode: Send {
    /// Which kind of source this is
    fn kind(&self) -> SourceKind;

    /// Overwrite `out` with the next block
    fn render(&mut self, out: &mut AudioBuffer);

    /// Release anything held (capture devices); the node is not reused
    fn stop(&mut self) {}
}

/// Generate a noise buffer of independent uniform samples in [-1, 1]
pub fn generate_noise(num_frames: usize, seed: Option<u64>) -> Vec<f32> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..num_frames).map(|_| rng.gen_range(-1.0..=1.0)).collect()
}

// ============================================================================
// Noise
// ============================================================================

/// Loops a shared noise buffer, identical on every channel
pub struct NoiseSource {
    noise: Arc<Vec<f32>>,
    position: usize,
}

impl NoiseSource {
    pub fn new(noise: Arc<Vec<f32>>) -> Self {
        Self { noise, position: 0 }
    }
}

impl SourceNode for NoiseSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Noise
    }

    fn render(&mut self, out: &mut AudioBuffer) {
        if self.noise.is_empty() {
            out.fill_silence();
            return;
        }
        let start = self.position;
        for channel in &mut out.samples {
            let mut position = start;
            for sample in channel.iter_mut() {
                *sample = self.noise[position];
                position = (position + 1) % self.noise.len();
            }
        }
        self.position = (start + out.num_frames()) % self.noise.len();
    }
}

// ============================================================================
// Oscillator
// ============================================================================

/// Fixed-frequency test tone
pub struct OscillatorSource {
    waveform: Waveform,
    frequency: f64,
    amplitude: f32,
    phase: f64,
}

impl OscillatorSource {
    pub fn new(waveform: Waveform, frequency: f64, amplitude: f32) -> Self {
        Self {
            waveform,
            frequency,
            amplitude,
            phase: 0.0,
        }
    }
}

impl SourceNode for OscillatorSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Oscillator
    }

    fn render(&mut self, out: &mut AudioBuffer) {
        let increment = self.frequency / out.sample_rate.max(1) as f64;
        let start = self.phase;
        for channel in &mut out.samples {
            let mut phase = start;
            for sample in channel.iter_mut() {
                *sample = self.waveform.sample(phase) as f32 * self.amplitude;
                phase = (phase + increment).fract();
            }
        }
        self.phase = (start + increment * out.num_frames() as f64).fract();
    }
}

// ============================================================================
// Microphone
// ============================================================================

/// Live capture, copied to every output channel
pub struct MicrophoneSource {
    stream: Box<dyn CaptureStream>,
    scratch: Vec<f32>,
    closed: bool,
}

impl MicrophoneSource {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self {
            stream,
            scratch: Vec::new(),
            closed: false,
        }
    }
}

impl SourceNode for MicrophoneSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Microphone
    }

    fn render(&mut self, out: &mut AudioBuffer) {
        self.scratch.resize(out.num_frames(), 0.0);
        self.stream.read(&mut self.scratch);
        for channel in &mut out.samples {
            channel.copy_from_slice(&self.scratch);
        }
    }

    fn stop(&mut self) {
        if !self.closed {
            self.stream.close();
            self.closed = true;
        }
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// File
// ============================================================================

/// Plays a decoded buffer from an offset, resampling to the graph rate
///
/// Output channels beyond the file's channel count repeat the file's
/// channels in order (mono files play on every channel).
pub struct FileSource {
    buffer: Arc<AudioBuffer>,
    /// Read position in file frames
    position: f64,
    looping: bool,
}

impl FileSource {
    /// Start at `offset_secs` into the file
    pub fn new(buffer: Arc<AudioBuffer>, offset_secs: f64, looping: bool) -> Self {
        let frames = buffer.num_frames() as f64;
        let mut position = offset_secs.max(0.0) * buffer.sample_rate as f64;
        if looping && frames > 0.0 {
            position %= frames;
        }
        Self {
            buffer,
            position,
            looping,
        }
    }

    fn read_frame(&self, channel: &[f32], position: f64) -> f32 {
        let len = channel.len();
        let index = position.floor() as usize;
        let frac = (position - index as f64) as f32;
        let next = if index + 1 < len {
            Some(index + 1)
        } else if self.looping {
            Some(0)
        } else {
            None
        };
        match (channel.get(index), next.and_then(|n| channel.get(n))) {
            (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
            (Some(&a), None) => a,
            _ => 0.0,
        }
    }
}

impl SourceNode for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn render(&mut self, out: &mut AudioBuffer) {
        let file_frames = self.buffer.num_frames() as f64;
        let file_channels = self.buffer.num_channels();
        if file_frames == 0.0 || file_channels == 0 {
            out.fill_silence();
            return;
        }

        let step = self.buffer.sample_rate as f64 / out.sample_rate.max(1) as f64;
        let start = self.position;
        for (ch, channel) in out.samples.iter_mut().enumerate() {
            let source = self.buffer.channel(ch % file_channels);
            let mut position = start;
            for sample in channel.iter_mut() {
                if position >= file_frames {
                    if self.looping {
                        position %= file_frames;
                    } else {
                        *sample = 0.0;
                        continue;
                    }
                }
                *sample = self.read_frame(source, position);
                position += step;
            }
        }

        let mut end = start + step * out.num_frames() as f64;
        if self.looping {
            end %= file_frames;
        } else {
            end = end.min(file_frames);
        }
        self.position = end;
    }
}
