//! Nueva EQ - Parametric Equalizer Core
//!
//! A multi-band parametric equalizer that keeps what you hear and what you
//! see identical: the live filter chain and the drawn response curve are
//! derived from the same biquad coefficients.
//!
//! # Architecture
//!
//! - `dsp`: coefficient derivation, band model, dynamics preview, composite
//!   response and the filter chain
//! - `engine`: sources, the live signal graph with its measurement taps,
//!   offline rendering, WAV encode/decode, and the controller that owns the
//!   band collection
//! - `config`: engine configuration
//! - `cli`: the `eq-cli` command implementations

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use error::{EqError, ErrorKind, Result};
