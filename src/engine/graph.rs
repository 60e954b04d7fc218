//! Live signal graph
//!
//! Source -> input tap -> filter chain -> output tap -> output sink.
//!
//! The source slot and the chain live behind one mutex that the render
//! callback holds for a whole block. Every mutation prepares its new piece
//! off-lock and installs it with a single assignment, so a block is always
//! rendered against one consistent graph.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use super::buffer::AudioBuffer;
use super::device::{AudioOutput, MicrophoneAccess};
use super::source::{
    generate_noise, FileSource, MicrophoneSource, NoiseSource, OscillatorSource, SourceKind,
    SourceNode,
};
use super::tap::MeasurementTap;
use crate::config::EngineConfig;
use crate::dsp::{Band, BiquadCoeffs, FilterChain};
use crate::error::{EqError, Result};

struct LiveState {
    source: Option<Box<dyn SourceNode>>,
    chain: FilterChain,
    frames_rendered: u64,
}

struct GraphCore {
    live: Mutex<LiveState>,
    input_tap: Arc<MeasurementTap>,
    output_tap: Arc<MeasurementTap>,
    sample_rate: u32,
    num_channels: usize,
    block_size: usize,
}

impl GraphCore {
    /// Render `block.num_frames()` frames into `block`, reusing its storage
    fn render_into(&self, block: &mut AudioBuffer) {
        let num_frames = block.num_frames();
        block.reshape(self.num_channels, num_frames);
        block.sample_rate = self.sample_rate;

        let mut live = self.live.lock();
        if let Some(source) = live.source.as_mut() {
            source.render(block);
        }
        self.input_tap.capture(block);
        live.chain.process(block);
        self.output_tap.capture(block);
        live.frames_rendered += num_frames as u64;

        trace!("Rendered block of {} frames", num_frames);
    }

    fn render_block(&self, num_frames: usize) -> AudioBuffer {
        let mut block = AudioBuffer::new(self.num_channels, num_frames, self.sample_rate);
        self.render_into(&mut block);
        block
    }

    fn new_block(&self) -> AudioBuffer {
        AudioBuffer::new(self.num_channels, self.block_size, self.sample_rate)
    }

    fn now_secs(&self) -> f64 {
        self.live.lock().frames_rendered as f64 / self.sample_rate as f64
    }
}

/// Handle for the host's audio callback
///
/// Cloneable and `Send`; it can only pull blocks and read taps.
#[derive(Clone)]
pub struct RenderHandle {
    core: Arc<GraphCore>,
}

impl RenderHandle {
    /// Render the next block of `num_frames` frames into a fresh buffer
    pub fn render_block(&self, num_frames: usize) -> AudioBuffer {
        self.core.render_block(num_frames)
    }

    /// Render the next `out.num_frames()` frames into `out`
    ///
    /// `out` is reshaped to the graph's channel count; a buffer from
    /// [`RenderHandle::new_block`] is rendered into without allocating.
    pub fn render_into(&self, out: &mut AudioBuffer) {
        self.core.render_into(out);
    }

    /// Scratch buffer of the configured block size
    pub fn new_block(&self) -> AudioBuffer {
        self.core.new_block()
    }

    /// Configured frames per callback
    pub fn block_size(&self) -> usize {
        self.core.block_size
    }

    /// Tap observing the raw source
    pub fn input_tap(&self) -> Arc<MeasurementTap> {
        self.core.input_tap.clone()
    }

    /// Tap observing the end of the filter chain
    pub fn output_tap(&self) -> Arc<MeasurementTap> {
        self.core.output_tap.clone()
    }
}

/// Read-only copy of the installed chain
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub band_ids: Vec<String>,
    pub coefficients: Vec<BiquadCoeffs>,
    pub sample_rate: f64,
}

/// The live graph, exclusively owned by the controller
pub struct SignalGraph {
    config: EngineConfig,
    core: Arc<GraphCore>,
    noise: Arc<Vec<f32>>,
    microphone: Box<dyn MicrophoneAccess>,
    output: Box<dyn AudioOutput>,
    output_running: bool,
    active: Option<SourceKind>,
    file: Option<Arc<AudioBuffer>>,
    /// Cumulative File playback position in seconds
    file_offset: f64,
    /// Graph time at which the current File playback started
    file_started_at: Option<f64>,
}

impl SignalGraph {
    pub fn new(
        config: EngineConfig,
        microphone: Box<dyn MicrophoneAccess>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        let config = config.validated();
        let noise_frames = (config.noise_duration_secs * config.sample_rate as f64) as usize;
        let noise = Arc::new(generate_noise(noise_frames, config.noise_seed));

        let core = Arc::new(GraphCore {
            live: Mutex::new(LiveState {
                source: None,
                chain: FilterChain::new(config.sample_rate as f64, config.output_channels),
                frames_rendered: 0,
            }),
            input_tap: Arc::new(MeasurementTap::new(
                config.analyser_fft_size,
                config.sample_rate,
            )),
            output_tap: Arc::new(MeasurementTap::new(
                config.analyser_fft_size,
                config.sample_rate,
            )),
            sample_rate: config.sample_rate,
            num_channels: config.output_channels,
            block_size: config.block_size,
        });

        debug!(
            "Signal graph created: {} Hz, {} channels, {} noise frames",
            config.sample_rate, config.output_channels, noise_frames
        );

        Self {
            config,
            core,
            noise,
            microphone,
            output,
            output_running: false,
            active: None,
            file: None,
            file_offset: 0.0,
            file_started_at: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.core.sample_rate
    }

    /// Handle for the audio callback
    pub fn render_handle(&self) -> RenderHandle {
        RenderHandle {
            core: self.core.clone(),
        }
    }

    /// Render the next block (same as the callback would)
    pub fn render_block(&self, num_frames: usize) -> AudioBuffer {
        self.core.render_block(num_frames)
    }

    pub fn input_tap(&self) -> Arc<MeasurementTap> {
        self.core.input_tap.clone()
    }

    pub fn output_tap(&self) -> Arc<MeasurementTap> {
        self.core.output_tap.clone()
    }

    /// Graph time in seconds (frames rendered so far)
    pub fn now_secs(&self) -> f64 {
        self.core.now_secs()
    }

    /// Currently playing source, if any
    pub fn active_source(&self) -> Option<SourceKind> {
        self.active
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    // ========================================================================
    // Chain
    // ========================================================================

    /// Replace the chain with one built from `bands`
    pub fn rebuild(&self, bands: &[Band]) {
        let chain = FilterChain::build(
            bands,
            self.core.sample_rate as f64,
            self.core.num_channels,
        );
        let stages = chain.len();
        self.core.live.lock().chain = chain;
        debug!("Installed chain with {} stages", stages);
    }

    pub fn chain_snapshot(&self) -> ChainSnapshot {
        let live = self.core.live.lock();
        ChainSnapshot {
            band_ids: live
                .chain
                .band_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            coefficients: live.chain.coefficient_set(),
            sample_rate: live.chain.sample_rate(),
        }
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Swap in a new source, stopping whatever was playing
    ///
    /// On failure (no decoded file, microphone denied, output sink error)
    /// the graph is left exactly as it was. Re-selecting the microphone is
    /// the exception: the open stream is released before the device is
    /// asked again, so a denial there leaves the graph stopped.
    pub fn start_source(&mut self, kind: SourceKind) -> Result<()> {
        if kind == SourceKind::Microphone && self.active == Some(SourceKind::Microphone) {
            debug!("Releasing microphone before re-acquiring it");
            self.stop();
        }

        let now = self.now_secs();
        let file_position = self.file_position_at(now);
        let node = self.build_source(kind, file_position)?;

        if !self.output_running {
            self.output.start()?;
            self.output_running = true;
        }

        let previous = {
            let mut live = self.core.live.lock();
            live.chain.reset();
            live.source.replace(node)
        };
        if let Some(mut previous) = previous {
            previous.stop();
        }

        if self.active == Some(SourceKind::File) || kind == SourceKind::File {
            self.file_offset = file_position;
        }
        self.file_started_at = (kind == SourceKind::File).then_some(now);

        info!(
            "Source {} -> {}",
            self.active
                .map(|k| k.to_string())
                .unwrap_or_else(|| "none".to_string()),
            kind
        );
        self.active = Some(kind);
        Ok(())
    }

    /// Stop the current source, keeping the File offset for a later resume
    ///
    /// Both taps are cleared so meters fall back to silence.
    pub fn stop(&mut self) {
        let now = self.now_secs();
        if self.active == Some(SourceKind::File) {
            self.file_offset = self.file_position_at(now);
        }

        let previous = self.core.live.lock().source.take();
        if let Some(mut previous) = previous {
            previous.stop();
        }
        self.file_started_at = None;
        self.core.input_tap.clear();
        self.core.output_tap.clear();

        if self.output_running {
            self.output.stop();
            self.output_running = false;
        }
        if let Some(kind) = self.active.take() {
            info!("Stopped {} source", kind);
        }
    }

    fn build_source(&mut self, kind: SourceKind, file_position: f64) -> Result<Box<dyn SourceNode>> {
        let node: Box<dyn SourceNode> = match kind {
            SourceKind::Noise => Box::new(NoiseSource::new(self.noise.clone())),
            SourceKind::Oscillator => Box::new(OscillatorSource::new(
                self.config.oscillator_waveform,
                self.config.oscillator_frequency,
                self.config.oscillator_amplitude,
            )),
            SourceKind::Microphone => {
                let stream = self
                    .microphone
                    .acquire(self.core.sample_rate)
                    .map_err(|e| {
                        warn!("Microphone unavailable: {}", e);
                        e
                    })?;
                Box::new(MicrophoneSource::new(stream))
            }
            SourceKind::File => {
                let buffer = self.file.clone().ok_or_else(|| {
                    warn!("File playback requested with no decoded buffer");
                    EqError::NoSourceLoaded
                })?;
                Box::new(FileSource::new(buffer, file_position, self.config.loop_file))
            }
        };
        Ok(node)
    }

    // ========================================================================
    // File
    // ========================================================================

    /// Install a decoded buffer for File playback
    ///
    /// Stops File playback if it is running and rewinds to the start.
    pub fn set_file(&mut self, buffer: Arc<AudioBuffer>) {
        if self.active == Some(SourceKind::File) {
            self.stop();
        }
        self.file = Some(buffer);
        self.file_offset = 0.0;
        self.file_started_at = None;
    }

    pub fn file(&self) -> Option<&Arc<AudioBuffer>> {
        self.file.as_ref()
    }

    /// Current File playback position in seconds
    pub fn file_position(&self) -> f64 {
        self.file_position_at(self.now_secs())
    }

    /// Move the File playback position
    ///
    /// Clamped to the buffer duration; applies immediately when playing.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        let duration = self
            .file
            .as_ref()
            .map(|f| f.duration_secs())
            .ok_or(EqError::NoSourceLoaded)?;
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, duration)
        };

        if self.active == Some(SourceKind::File) {
            let now = self.now_secs();
            let node = self.build_source(SourceKind::File, target)?;
            let previous = self.core.live.lock().source.replace(node);
            drop(previous);
            self.file_started_at = Some(now);
        }
        self.file_offset = target;
        debug!("Seeked file to {:.3} s", target);
        Ok(())
    }

    fn file_position_at(&self, now: f64) -> f64 {
        let Some(file) = self.file.as_ref() else {
            return 0.0;
        };
        let mut offset = self.file_offset;
        if self.active == Some(SourceKind::File) {
            if let Some(started) = self.file_started_at {
                offset += now - started;
            }
        }

        let duration = file.duration_secs();
        if duration <= 0.0 {
            0.0
        } else if self.config.loop_file {
            offset % duration
        } else if offset >= duration {
            // Played out; the next start rewinds
            0.0
        } else {
            offset
        }
    }
}

impl Drop for SignalGraph {
    fn drop(&mut self) {
        self.stop();
    }
}
