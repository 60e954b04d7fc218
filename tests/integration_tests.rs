//! Integration Tests
//!
//! End-to-end tests for the equalizer: curve model, live graph and export.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use test_case::test_case;

use nueva_eq::dsp::{
    composite_db, log_frequency_grid, Band, DynamicsSettings, FilterType, ResponseEvaluator,
};
use nueva_eq::engine::{
    encode_wav, sha256_hex, AudioBuffer, AudioOutput, CaptureStream, Decoder, EqController,
    MicrophoneAccess, NullOutput, SourceKind, WavDecoder, WAV_HEADER_LEN,
};
use nueva_eq::{EngineConfig, EqError, ErrorKind, Result};

/// Helper to create a test sine wave buffer
fn sine_buffer(frequency: f64, sample_rate: u32, channels: usize, frames: usize) -> AudioBuffer {
    let samples: Vec<f32> = (0..frames)
        .map(|i| {
            (0.5 * (2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate as f64).sin())
                as f32
        })
        .collect();
    AudioBuffer::from_channels(vec![samples; channels], sample_rate)
}

fn headless() -> EqController {
    EqController::headless(EngineConfig::default())
}

// === Response Curve ===

#[test]
fn test_single_peak_curve() {
    let bands = vec![Band::peaking(1000.0, 6.0, 1.0)];
    assert_abs_diff_eq!(composite_db(&bands, 1000.0, 48000.0), 6.0, epsilon = 0.5);
    assert_abs_diff_eq!(composite_db(&bands, 100.0, 48000.0), 0.0, epsilon = 1.0);
    assert_abs_diff_eq!(composite_db(&bands, 10000.0, 48000.0), 0.0, epsilon = 1.0);
}

#[test]
fn test_disabled_band_is_flat() {
    let bands = vec![Band::peaking(1000.0, 6.0, 1.0).with_enabled(false)];
    for f in log_frequency_grid(50, 20.0, 20000.0) {
        assert_eq!(composite_db(&bands, f, 48000.0), 0.0);
    }
}

#[test_case(FilterType::LowPass)]
#[test_case(FilterType::HighPass)]
#[test_case(FilterType::BandPass)]
#[test_case(FilterType::Notch)]
#[test_case(FilterType::Peaking)]
#[test_case(FilterType::LowShelf)]
#[test_case(FilterType::HighShelf)]
fn test_extreme_parameters_stay_finite(filter_type: FilterType) {
    let bands = vec![Band::new(filter_type, 999999.0, 99.0, 0.0001)];
    for f in [-5.0, 0.0, 1.0, 20000.0, 24000.0, 1e9, f64::NAN] {
        assert!(composite_db(&bands, f, 48000.0).is_finite());
    }
}

#[test]
fn test_dynamic_curve_adds_range() {
    let dynamics = DynamicsSettings {
        enabled: true,
        range: -6.0,
        ..Default::default()
    };
    let bands = vec![Band::peaking(1000.0, 3.0, 1.0).with_dynamics(dynamics)];
    let evaluator = ResponseEvaluator::new(&bands, 48000.0);
    assert_abs_diff_eq!(
        evaluator.dynamic_db(1000.0),
        evaluator.static_db(1000.0) - 6.0,
        epsilon = 1e-9
    );
}

// === Live Graph ===

#[test]
fn test_live_output_matches_curve() {
    let mut eq = EqController::headless(EngineConfig {
        oscillator_frequency: 1000.0,
        oscillator_amplitude: 0.5,
        ..Default::default()
    });
    eq.set_bands(vec![Band::peaking(1000.0, 9.0, 1.0)]);
    eq.start_source(SourceKind::Oscillator).unwrap();

    let handle = eq.render_handle();
    let mut block = handle.new_block();
    for _ in 0..20 {
        handle.render_into(&mut block);
    }

    let gain = eq.output_tap().rms_db() - eq.input_tap().rms_db();
    let predicted = eq.response_fn()(1000.0);
    assert_abs_diff_eq!(gain as f64, predicted, epsilon = 0.3);
}

#[test]
fn test_rebuild_while_rendering() {
    let mut eq = headless();
    eq.start_source(SourceKind::Noise).unwrap();
    let handle = eq.render_handle();

    let worker = std::thread::spawn(move || {
        let mut block = AudioBuffer::new(2, 128, 48000);
        for _ in 0..200 {
            handle.render_into(&mut block);
            assert!(block.is_finite());
        }
    });

    for i in 0..50 {
        eq.set_bands(vec![
            Band::peaking(200.0 + i as f64 * 10.0, 6.0, 1.0),
            Band::high_shelf(8000.0, -4.0, 0.7),
        ]);
    }
    worker.join().unwrap();
    assert_eq!(eq.chain_snapshot().band_ids.len(), 2);
}

struct SharedCapture {
    closed: Arc<Mutex<bool>>,
}

impl CaptureStream for SharedCapture {
    fn read(&mut self, out: &mut [f32]) {
        out.fill(0.1);
    }

    fn close(&mut self) {
        *self.closed.lock() = true;
    }
}

struct ScriptedMicrophone {
    allow: bool,
    closed: Arc<Mutex<bool>>,
}

impl MicrophoneAccess for ScriptedMicrophone {
    fn acquire(&mut self, _sample_rate: u32) -> Result<Box<dyn CaptureStream>> {
        if self.allow {
            Ok(Box::new(SharedCapture {
                closed: self.closed.clone(),
            }))
        } else {
            Err(EqError::PermissionDenied {
                device: "microphone".to_string(),
                reason: "user declined".to_string(),
            })
        }
    }
}

#[derive(Default)]
struct CountingOutput {
    starts: Arc<Mutex<u32>>,
}

impl AudioOutput for CountingOutput {
    fn start(&mut self) -> Result<()> {
        *self.starts.lock() += 1;
        Ok(())
    }

    fn stop(&mut self) {}
}

#[test]
fn test_microphone_denied_leaves_graph_untouched() {
    let mut eq = EqController::new(
        EngineConfig::default(),
        Box::new(ScriptedMicrophone {
            allow: false,
            closed: Arc::default(),
        }),
        Box::new(NullOutput),
        Box::new(WavDecoder),
    );
    eq.set_bands(vec![Band::peaking(500.0, 3.0, 1.0).with_id("mid")]);
    eq.start_source(SourceKind::Noise).unwrap();

    let err = eq.start_source(SourceKind::Microphone).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(eq.active_source(), Some(SourceKind::Noise));
    assert_eq!(eq.chain_snapshot().band_ids, vec!["mid"]);
}

#[test]
fn test_microphone_granted_then_released() {
    let closed = Arc::new(Mutex::new(false));
    let starts = Arc::new(Mutex::new(0));
    let mut eq = EqController::new(
        EngineConfig::default(),
        Box::new(ScriptedMicrophone {
            allow: true,
            closed: closed.clone(),
        }),
        Box::new(CountingOutput {
            starts: starts.clone(),
        }),
        Box::new(WavDecoder),
    );

    eq.start_source(SourceKind::Microphone).unwrap();
    let block = eq.render_handle().render_block(16);
    assert!(block.samples.iter().flatten().all(|&s| s == 0.1));

    eq.start_source(SourceKind::Oscillator).unwrap();
    assert!(*closed.lock());
    assert_eq!(*starts.lock(), 1);
}

#[test]
fn test_file_playback_needs_a_file() {
    let mut eq = headless();
    let err = eq.start_source(SourceKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert_eq!(eq.active_source(), None);
}

// === Export ===

#[test]
fn test_export_silence() {
    let mut eq = headless();
    eq.set_bands(vec![
        Band::peaking(1000.0, 12.0, 2.0),
        Band::low_shelf(100.0, 6.0, 0.7),
    ]);
    eq.load_buffer(AudioBuffer::new(2, 1000, 44100));

    let bytes = eq.export().unwrap();
    let data_len = 1000 * 2 * 2;
    assert_eq!(bytes.len(), WAV_HEADER_LEN + data_len);
    assert_eq!(LittleEndian::read_u32(&bytes[4..8]) as usize, 36 + data_len);
    assert_eq!(LittleEndian::read_u32(&bytes[40..44]) as usize, data_len);
    assert!(bytes[WAV_HEADER_LEN..].iter().all(|&b| b == 0));
}

#[test]
fn test_export_too_wide_for_wav_is_render_error() {
    let mut eq = headless();
    eq.load_buffer(AudioBuffer::new(40000, 1, 48000));
    let err = eq.export().unwrap_err();
    assert!(matches!(err, EqError::Render { .. }));
    assert_eq!(err.kind(), ErrorKind::Render);
}

#[test]
fn test_microphone_reselect_releases_previous_stream() {
    let closed = Arc::new(Mutex::new(false));
    let mut eq = EqController::new(
        EngineConfig::default(),
        Box::new(ScriptedMicrophone {
            allow: true,
            closed: closed.clone(),
        }),
        Box::new(NullOutput),
        Box::new(WavDecoder),
    );
    eq.start_source(SourceKind::Microphone).unwrap();
    eq.start_source(SourceKind::Microphone).unwrap();
    assert!(*closed.lock());
    assert_eq!(eq.active_source(), Some(SourceKind::Microphone));
}

#[test]
fn test_export_without_file_is_load_error() {
    let eq = headless();
    let err = eq.export().unwrap_err();
    assert!(matches!(err, EqError::NoSourceLoaded));
    assert_eq!(err.kind(), ErrorKind::Load);
}

#[test]
fn test_export_is_deterministic() {
    let mut eq = headless();
    eq.set_bands(vec![
        Band::high_pass(80.0, 0.7),
        Band::peaking(2500.0, -4.0, 3.0),
        Band::high_shelf(9000.0, 2.0, 0.7),
    ]);
    eq.load_file(&encode_wav(&sine_buffer(440.0, 44100, 2, 22050)).unwrap())
        .unwrap();

    let first = eq.export().unwrap();
    let second = eq.spawn_export().join().unwrap().unwrap();
    assert_eq!(sha256_hex(&first), sha256_hex(&second));
}

#[test]
fn test_export_matches_file_shape() {
    let mut eq = headless();
    eq.set_bands(vec![Band::peaking(1000.0, 6.0, 1.0)]);
    eq.load_file(&encode_wav(&sine_buffer(1000.0, 32000, 3, 3200)).unwrap())
        .unwrap();

    let decoded = WavDecoder.decode(&eq.export().unwrap()).unwrap();
    assert_eq!(decoded.num_channels(), 3);
    assert_eq!(decoded.num_frames(), 3200);
    assert_eq!(decoded.sample_rate, 32000);
}

#[test]
fn test_export_gain_matches_curve_at_file_rate() {
    let mut eq = headless();
    eq.set_bands(vec![Band::peaking(2000.0, -8.0, 1.5)]);
    eq.load_buffer(sine_buffer(2000.0, 44100, 1, 44100));

    let decoded = WavDecoder.decode(&eq.export().unwrap()).unwrap();
    let tail = |b: &AudioBuffer| nueva_eq::engine::rms_db(&b.channel(0)[22050..]);
    let source = sine_buffer(2000.0, 44100, 1, 44100);
    let measured = (tail(&decoded) - tail(&source)) as f64;

    let predicted = composite_db(eq.bands(), 2000.0, 44100.0);
    assert_abs_diff_eq!(measured, predicted, epsilon = 0.2);
}
