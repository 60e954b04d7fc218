//! Device I/O boundary
//!
//! Microphone capture and the output sink are provided by the host. The
//! core only needs start/stop semantics and a way to pull captured
//! samples on the render callback.

use log::debug;

use crate::error::{EqError, Result};

/// A live capture stream handed out by a granted microphone request
pub trait CaptureStream: Send {
    /// Fill `out` with the next mono samples; silence if none are ready
    fn read(&mut self, out: &mut [f32]);

    /// Release the underlying device
    fn close(&mut self);
}

/// Access to the host's microphone
pub trait MicrophoneAccess: Send {
    /// Ask for a capture stream at `sample_rate`
    ///
    /// May block while the user or OS decides. A refusal is reported as
    /// `EqError::PermissionDenied`.
    fn acquire(&mut self, sample_rate: u32) -> Result<Box<dyn CaptureStream>>;
}

/// The host's audio output
pub trait AudioOutput: Send {
    /// Begin pulling blocks from the render callback
    fn start(&mut self) -> Result<()>;

    /// Stop pulling blocks
    fn stop(&mut self);
}

/// Microphone access for hosts without a capture device
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMicrophone;

impl MicrophoneAccess for NoMicrophone {
    fn acquire(&mut self, _sample_rate: u32) -> Result<Box<dyn CaptureStream>> {
        Err(EqError::PermissionDenied {
            device: "microphone".to_string(),
            reason: "no capture device is available".to_string(),
        })
    }
}

/// Output sink that discards everything (offline and test hosts)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn start(&mut self) -> Result<()> {
        debug!("Null output started");
        Ok(())
    }

    fn stop(&mut self) {
        debug!("Null output stopped");
    }
}
