//! Error handling for the equalizer core
//!
//! Out-of-range band parameters are never errors: they are clamped at the
//! point of use. Everything else surfaces as an `EqError`.

use thiserror::Error;

/// Result type alias for equalizer operations
pub type Result<T> = std::result::Result<T, EqError>;

/// Coarse error category, used by callers to pick user-facing messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Device access was refused
    Permission,
    /// No usable audio was available (missing or undecodable)
    Load,
    /// Offline processing failed
    Render,
    /// File system, device or serialization failure
    Io,
}

/// Main error type for equalizer operations
#[derive(Error, Debug)]
pub enum EqError {
    // Device Errors
    #[error("Permission denied for {device}: {reason}")]
    PermissionDenied { device: String, reason: String },

    #[error("Audio device error: {reason}")]
    Device { reason: String },

    // Load Errors
    #[error("No decoded audio is loaded")]
    NoSourceLoaded,

    #[error("Could not decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Render Errors
    #[error("Offline render failed: {reason}")]
    Render { reason: String },

    #[error("An export is already in progress")]
    RenderInProgress,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EqError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EqError::PermissionDenied { .. } => "PERMISSION_DENIED",
            EqError::Device { .. } => "DEVICE_ERROR",
            EqError::NoSourceLoaded => "NO_SOURCE_LOADED",
            EqError::Decode { .. } => "DECODE_ERROR",
            EqError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EqError::Render { .. } => "RENDER_ERROR",
            EqError::RenderInProgress => "RENDER_IN_PROGRESS",
            EqError::Io(_) => "IO_ERROR",
            EqError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Map onto the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            EqError::PermissionDenied { .. } => ErrorKind::Permission,
            EqError::NoSourceLoaded | EqError::Decode { .. } | EqError::UnsupportedFormat { .. } => {
                ErrorKind::Load
            }
            EqError::Render { .. } | EqError::RenderInProgress => ErrorKind::Render,
            EqError::Device { .. } | EqError::Io(_) | EqError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EqError::PermissionDenied { .. }
                | EqError::NoSourceLoaded
                | EqError::Decode { .. }
                | EqError::UnsupportedFormat { .. }
                | EqError::RenderInProgress
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EqError::PermissionDenied { .. } => vec![
                "Allow microphone access in the system settings",
                "Use the noise or oscillator source instead",
            ],
            EqError::NoSourceLoaded => vec![
                "Load an audio file before exporting",
                "Supported input: WAV (8/16/24/32-bit integer, 32-bit float)",
            ],
            EqError::Decode { .. } => vec![
                "Check if the file plays in another application",
                "Try converting the file to WAV format first",
            ],
            EqError::UnsupportedFormat { .. } => vec!["Convert to 16-bit or 24-bit PCM WAV"],
            EqError::RenderInProgress => vec!["Wait for the current export to finish"],
            _ => vec![],
        }
    }
}
