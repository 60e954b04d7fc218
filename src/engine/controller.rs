//! Equalizer controller
//!
//! Single owner of the band collection and the live graph. Every band edit
//! is clamped, checked for id uniqueness and followed by exactly one
//! rebuild. Visualization gets response functions and taps, never the
//! graph itself.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};

use super::buffer::AudioBuffer;
use super::device::{AudioOutput, MicrophoneAccess, NoMicrophone, NullOutput};
use super::graph::{ChainSnapshot, RenderHandle, SignalGraph};
use super::render::OfflineRenderer;
use super::source::SourceKind;
use super::tap::MeasurementTap;
use super::wav::{Decoder, WavDecoder};
use crate::config::EngineConfig;
use crate::dsp::{new_band_id, Band, ResponseEvaluator};
use crate::error::Result;

pub struct EqController {
    bands: Vec<Band>,
    graph: SignalGraph,
    decoder: Box<dyn Decoder>,
    renderer: Arc<OfflineRenderer>,
    preview_sample_rate: f64,
}

impl EqController {
    pub fn new(
        config: EngineConfig,
        microphone: Box<dyn MicrophoneAccess>,
        output: Box<dyn AudioOutput>,
        decoder: Box<dyn Decoder>,
    ) -> Self {
        let graph = SignalGraph::new(config, microphone, output);
        let preview_sample_rate = graph.config().preview_rate() as f64;
        Self {
            bands: Vec::new(),
            graph,
            decoder,
            renderer: Arc::new(OfflineRenderer::new()),
            preview_sample_rate,
        }
    }

    /// Controller with no microphone, a discarding output and WAV decoding
    pub fn headless(config: EngineConfig) -> Self {
        Self::new(
            config,
            Box::new(NoMicrophone),
            Box::new(NullOutput),
            Box::new(WavDecoder),
        )
    }

    // ========================================================================
    // Bands
    // ========================================================================

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, id: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.id == id)
    }

    /// Replace the whole collection
    pub fn set_bands(&mut self, bands: Vec<Band>) {
        self.bands = normalize(bands);
        self.rebuild();
    }

    /// Append a band, returning its (possibly reassigned) id
    pub fn add_band(&mut self, band: Band) -> String {
        let mut band = band.clamped();
        if band.id.is_empty() || self.band(&band.id).is_some() {
            let fresh = new_band_id();
            warn!("Band id {:?} already in use, assigning {}", band.id, fresh);
            band.id = fresh;
        }
        let id = band.id.clone();
        self.bands.push(band);
        self.rebuild();
        id
    }

    /// Edit a band in place; false if no band has `id`
    ///
    /// The id itself cannot be changed through this call.
    pub fn update_band<F: FnOnce(&mut Band)>(&mut self, id: &str, edit: F) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let mut band = self.bands[index].clone();
        edit(&mut band);
        band.id = id.to_string();
        self.bands[index] = band.clamped();
        self.rebuild();
        true
    }

    pub fn remove_band(&mut self, id: &str) -> Option<Band> {
        let index = self.position(id)?;
        let removed = self.bands.remove(index);
        self.rebuild();
        Some(removed)
    }

    /// Move a band to `index` (clamped to the end of the collection)
    pub fn move_band(&mut self, id: &str, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let band = self.bands.remove(from);
        let to = index.min(self.bands.len());
        self.bands.insert(to, band);
        self.rebuild();
        true
    }

    pub fn set_band_enabled(&mut self, id: &str, enabled: bool) -> bool {
        self.update_band(id, |band| band.enabled = enabled)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.bands.iter().position(|b| b.id == id)
    }

    /// Push the current collection to the live graph
    pub fn rebuild(&mut self) {
        self.graph.rebuild(&self.bands);
    }

    /// What the live graph is running right now
    pub fn chain_snapshot(&self) -> ChainSnapshot {
        self.graph.chain_snapshot()
    }

    // ========================================================================
    // Response
    // ========================================================================

    /// Snapshot of the collection for curve drawing
    pub fn response(&self) -> ResponseEvaluator {
        ResponseEvaluator::new(&self.bands, self.preview_sample_rate)
    }

    /// Static composite curve as a plain `frequency -> dB` function
    pub fn response_fn(&self) -> impl Fn(f64) -> f64 + Send + Sync {
        self.response().into_static_fn()
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Decode file bytes and make them available for playback and export
    pub fn load_file(&mut self, bytes: &[u8]) -> Result<()> {
        let buffer = self.decoder.decode(bytes)?;
        self.load_buffer(buffer);
        Ok(())
    }

    /// Install an already decoded buffer
    pub fn load_buffer(&mut self, buffer: AudioBuffer) {
        info!(
            "Loaded {} channels x {} frames at {} Hz ({:.2} s)",
            buffer.num_channels(),
            buffer.num_frames(),
            buffer.sample_rate,
            buffer.duration_secs()
        );
        self.graph.set_file(Arc::new(buffer));
    }

    pub fn file(&self) -> Option<&AudioBuffer> {
        self.graph.file().map(Arc::as_ref)
    }

    pub fn start_source(&mut self, kind: SourceKind) -> Result<()> {
        self.graph.start_source(kind)
    }

    pub fn stop(&mut self) {
        self.graph.stop();
    }

    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        self.graph.seek(seconds)
    }

    pub fn active_source(&self) -> Option<SourceKind> {
        self.graph.active_source()
    }

    pub fn render_handle(&self) -> RenderHandle {
        self.graph.render_handle()
    }

    pub fn input_tap(&self) -> Arc<MeasurementTap> {
        self.graph.input_tap()
    }

    pub fn output_tap(&self) -> Arc<MeasurementTap> {
        self.graph.output_tap()
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Render the loaded file through the current bands as WAV bytes
    pub fn export(&self) -> Result<Vec<u8>> {
        self.renderer
            .export(self.graph.file().map(Arc::as_ref), &self.bands)
    }

    /// Run an export on a worker thread
    ///
    /// The band collection is snapshotted now; later edits do not affect
    /// the job. A second export while one is running fails with
    /// `EqError::RenderInProgress`.
    pub fn spawn_export(&self) -> JoinHandle<Result<Vec<u8>>> {
        let renderer = self.renderer.clone();
        let file = self.graph.file().cloned();
        let bands = self.bands.clone();
        debug!("Spawning export of {} bands", bands.len());
        std::thread::spawn(move || renderer.export(file.as_deref(), &bands))
    }
}

/// Clamp every band and make ids unique
fn normalize(bands: Vec<Band>) -> Vec<Band> {
    let mut seen = HashSet::new();
    bands
        .into_iter()
        .map(|band| {
            let mut band = band.clamped();
            if band.id.is_empty() || !seen.insert(band.id.clone()) {
                let fresh = new_band_id();
                warn!("Duplicate band id {:?}, assigning {}", band.id, fresh);
                band.id = fresh;
                seen.insert(band.id.clone());
            }
            band
        })
        .collect()
}
