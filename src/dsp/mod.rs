//! DSP core
//!
//! Coefficient derivation, band model, dynamics preview, composite
//! response and the filter chain. Everything here is free of device and
//! threading concerns.

mod band;
mod biquad;
mod chain;
mod dynamics;
mod filter;
mod response;

pub use band::{
    accent_for_index, default_bands, Band, DynamicsSettings, ACCENT_PALETTE, MAX_GAIN_DB,
    MIN_GAIN_DB,
};
pub(crate) use band::new_band_id;
pub use biquad::Biquad;
pub use chain::{ChainStage, FilterChain};
pub use dynamics::{modulated_magnitude_db, modulation_db};
pub use filter::{
    clamp_center_frequency, clamp_q, coefficients, response, BiquadCoeffs, FilterType,
    MAX_FREQUENCY, MAX_Q, MIN_FREQUENCY, MIN_Q,
};
pub use response::{
    composite_db, log_frequency_grid, ResponseCurve, ResponseEvaluator, ResponsePoint,
};
