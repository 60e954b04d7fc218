//! Audio Engine Module
//!
//! Everything that moves audio:
//! - Planar buffers
//! - Sources and the device boundary
//! - The live signal graph and its measurement taps
//! - Offline rendering and WAV encode/decode
//! - The controller that owns it all

pub mod buffer;
pub mod controller;
pub mod device;
pub mod graph;
pub mod render;
pub mod source;
pub mod tap;
pub mod wav;

pub use buffer::{linear_to_db, peak_db, rms_db, AudioBuffer};
pub use controller::EqController;
pub use device::{AudioOutput, CaptureStream, MicrophoneAccess, NoMicrophone, NullOutput};
pub use graph::{ChainSnapshot, RenderHandle, SignalGraph};
pub use render::OfflineRenderer;
pub use source::{generate_noise, SourceKind, SourceNode, Waveform};
pub use tap::{MeasurementTap, SPECTRUM_FLOOR_DB};
pub use wav::{encode_wav, quantize_sample, sha256_hex, Decoder, WavDecoder, WAV_HEADER_LEN};
