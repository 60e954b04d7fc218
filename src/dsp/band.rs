//! EQ band model
//!
//! Bands are owned by the controlling application and handed to the core
//! as an ordered collection. Out-of-range values are never rejected: they
//! are clamped before any coefficient derivation.

use serde::{Deserialize, Serialize};

use super::filter::{self, BiquadCoeffs, FilterType, MAX_FREQUENCY, MAX_Q, MIN_FREQUENCY, MIN_Q};

/// Gain range in dB
pub const MIN_GAIN_DB: f64 = -30.0;
pub const MAX_GAIN_DB: f64 = 30.0;

/// Accent colors cycled through by band position
pub const ACCENT_PALETTE: [&str; 8] = [
    "#ff6b6b", "#ffa94d", "#ffd43b", "#69db7c", "#38d9a9", "#4dabf7", "#9775fa", "#f783ac",
];

/// Pick an accent color for the band at `index`
pub fn accent_for_index(index: usize) -> String {
    ACCENT_PALETTE[index % ACCENT_PALETTE.len()].to_string()
}

pub(crate) fn new_band_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Level-dependent gain modulation settings
///
/// Only the `enabled` flag and `range` shape the previewed response; the
/// remaining fields are stored for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsSettings {
    pub enabled: bool,
    /// Level above which modulation engages (dB, -100 to 0)
    pub threshold: f64,
    /// Modulation depth and direction (dB, -30 to +30)
    pub range: f64,
    /// Attack time (ms, 0.1 to 500)
    pub attack: f64,
    /// Release time (ms, 1 to 5000)
    pub release: f64,
    /// Ratio (1 to 20)
    pub ratio: f64,
    /// Knee width (dB, 0 to 24)
    pub knee: f64,
    /// Wet/dry mix (percent, 0 to 100)
    pub mix: f64,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: -24.0,
            range: -6.0,
            attack: 10.0,
            release: 100.0,
            ratio: 2.0,
            knee: 6.0,
            mix: 100.0,
        }
    }
}

impl DynamicsSettings {
    /// Copy with every field clamped into range
    pub fn clamped(&self) -> Self {
        Self {
            enabled: self.enabled,
            threshold: clamp_or(self.threshold, -100.0, 0.0, -24.0),
            range: clamp_or(self.range, MIN_GAIN_DB, MAX_GAIN_DB, 0.0),
            attack: clamp_or(self.attack, 0.1, 500.0, 10.0),
            release: clamp_or(self.release, 1.0, 5000.0, 100.0),
            ratio: clamp_or(self.ratio, 1.0, 20.0, 1.0),
            knee: clamp_or(self.knee, 0.0, 24.0, 0.0),
            mix: clamp_or(self.mix, 0.0, 100.0, 100.0),
        }
    }
}

/// Single EQ band configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Unique identifier within a band collection
    #[serde(default = "new_band_id")]
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Center/corner frequency in Hz (20-20000)
    pub frequency: f64,
    /// Gain in dB (-30 to +30); ignored by pass/notch types
    #[serde(default)]
    pub gain: f64,
    /// Q factor (0.1 to 18)
    #[serde(default = "default_q")]
    pub q: f64,
    #[serde(default)]
    pub filter_type: FilterType,
    #[serde(default)]
    pub dynamics: DynamicsSettings,
    /// Display color; no effect on processing
    #[serde(default)]
    pub accent: String,
}

fn default_enabled() -> bool {
    true
}

fn default_q() -> f64 {
    1.0
}

impl Default for Band {
    fn default() -> Self {
        Self {
            id: new_band_id(),
            enabled: true,
            frequency: 1000.0,
            gain: 0.0,
            q: 1.0,
            filter_type: FilterType::Peaking,
            dynamics: DynamicsSettings::default(),
            accent: accent_for_index(0),
        }
    }
}

impl Band {
    /// Create a new band with a fresh id
    pub fn new(filter_type: FilterType, frequency: f64, gain: f64, q: f64) -> Self {
        Self {
            frequency,
            gain,
            q,
            filter_type,
            ..Default::default()
        }
    }

    /// Create a peaking band
    pub fn peaking(frequency: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::Peaking, frequency, gain, q)
    }

    /// Create a low shelf band
    pub fn low_shelf(frequency: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::LowShelf, frequency, gain, q)
    }

    /// Create a high shelf band
    pub fn high_shelf(frequency: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::HighShelf, frequency, gain, q)
    }

    /// Create a low-pass band
    pub fn low_pass(frequency: f64, q: f64) -> Self {
        Self::new(FilterType::LowPass, frequency, 0.0, q)
    }

    /// Create a high-pass band
    pub fn high_pass(frequency: f64, q: f64) -> Self {
        Self::new(FilterType::HighPass, frequency, 0.0, q)
    }

    /// Create a band-pass band
    pub fn band_pass(frequency: f64, q: f64) -> Self {
        Self::new(FilterType::BandPass, frequency, 0.0, q)
    }

    /// Create a notch band
    pub fn notch(frequency: f64, q: f64) -> Self {
        Self::new(FilterType::Notch, frequency, 0.0, q)
    }

    /// Builder: override the id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: set dynamics
    pub fn with_dynamics(mut self, dynamics: DynamicsSettings) -> Self {
        self.dynamics = dynamics;
        self
    }

    /// Builder: set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether any parameter lies outside its valid range
    pub fn is_out_of_range(&self) -> bool {
        let in_range = |v: f64, min: f64, max: f64| v >= min && v <= max;
        !(in_range(self.frequency, MIN_FREQUENCY, MAX_FREQUENCY)
            && in_range(self.gain, MIN_GAIN_DB, MAX_GAIN_DB)
            && in_range(self.q, MIN_Q, MAX_Q))
            || self.dynamics.clamped() != self.dynamics
    }

    /// Copy with every parameter clamped into range
    pub fn clamped(&self) -> Self {
        Self {
            id: self.id.clone(),
            enabled: self.enabled,
            frequency: clamp_or(self.frequency, MIN_FREQUENCY, MAX_FREQUENCY, 1000.0),
            gain: clamp_or(self.gain, MIN_GAIN_DB, MAX_GAIN_DB, 0.0),
            q: clamp_or(self.q, MIN_Q, MAX_Q, 1.0),
            filter_type: self.filter_type,
            dynamics: self.dynamics.clamped(),
            accent: self.accent.clone(),
        }
    }

    /// Whether dynamics modulation applies to this band
    pub fn dynamics_active(&self) -> bool {
        self.dynamics.enabled && self.filter_type.has_gain()
    }

    /// Biquad coefficients at `sample_rate`, after clamping
    pub fn coefficients(&self, sample_rate: f64) -> BiquadCoeffs {
        let band = self.clamped();
        filter::coefficients(band.filter_type, band.frequency, band.q, band.gain, sample_rate)
    }

    /// Static magnitude in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.coefficients(sample_rate).magnitude_db(frequency, sample_rate)
    }
}

/// Five-band starting layout
pub fn default_bands() -> Vec<Band> {
    let layout = [
        (FilterType::LowShelf, 80.0, 0.0, 0.707),
        (FilterType::Peaking, 250.0, 0.0, 1.0),
        (FilterType::Peaking, 1000.0, 0.0, 1.0),
        (FilterType::Peaking, 4000.0, 0.0, 1.0),
        (FilterType::HighShelf, 10000.0, 0.0, 0.707),
    ];

    layout
        .iter()
        .enumerate()
        .map(|(i, &(filter_type, frequency, gain, q))| Band {
            accent: accent_for_index(i),
            ..Band::new(filter_type, frequency, gain, q)
        })
        .collect()
}
