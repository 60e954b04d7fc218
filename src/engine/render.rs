//! Offline rendering
//!
//! Runs a decoded buffer through a freshly built chain, independent of the
//! live graph, and encodes the result. Only one render may be in flight
//! per renderer.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use super::buffer::AudioBuffer;
use super::wav::encode_wav;
use crate::dsp::{Band, FilterChain};
use crate::error::{EqError, Result};

/// One-shot offline renderer
#[derive(Debug, Default)]
pub struct OfflineRenderer {
    busy: AtomicBool,
}

/// Clears the busy flag when a render ends, however it ends
struct RenderGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl OfflineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a render is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<RenderGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EqError::RenderInProgress)?;
        Ok(RenderGuard { busy: &self.busy })
    }

    /// Process `source` through the enabled bands
    ///
    /// The output has the source's channel count, length and sample rate.
    pub fn render(&self, source: Option<&AudioBuffer>, bands: &[Band]) -> Result<AudioBuffer> {
        let source = source.ok_or(EqError::NoSourceLoaded)?;
        let _guard = self.begin()?;

        if let Some(reason) = source.shape_error() {
            return Err(EqError::Render { reason });
        }

        let mut output = source.clone();
        let mut chain =
            FilterChain::build(bands, source.sample_rate as f64, source.num_channels());
        chain.process(&mut output);

        if !output.is_finite() {
            warn!("Offline render produced non-finite samples");
            return Err(EqError::Render {
                reason: "processing produced non-finite samples".to_string(),
            });
        }

        info!(
            "Rendered {} channels x {} frames at {} Hz through {} filters",
            output.num_channels(),
            output.num_frames(),
            output.sample_rate,
            chain.len()
        );
        Ok(output)
    }

    /// Render and encode as 16-bit PCM WAV bytes
    pub fn export(&self, source: Option<&AudioBuffer>, bands: &[Band]) -> Result<Vec<u8>> {
        let rendered = self.render(source, bands)?;
        encode_wav(&rendered)
    }
}
