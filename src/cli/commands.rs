//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;

use crate::config::EngineConfig;
use crate::dsp::{
    default_bands, log_frequency_grid, Band, ResponseCurve, MAX_FREQUENCY, MIN_FREQUENCY,
};
use crate::engine::{sha256_hex, EqController};
use crate::error::Result;

/// Read a band collection from JSON, or fall back to the default preset
pub fn load_bands(path: Option<&Path>) -> Result<Vec<Band>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let bands: Vec<Band> = serde_json::from_str(&text)?;
            info!("Loaded {} bands from {}", bands.len(), path.display());
            Ok(bands)
        }
        None => Ok(default_bands()),
    }
}

/// Equalize `input` and write the result to `output`
///
/// Returns the SHA-256 of the written bytes.
pub fn render(
    config: EngineConfig,
    input: &Path,
    bands: Option<&Path>,
    output: &Path,
) -> Result<String> {
    info!("Rendering {} -> {}", input.display(), output.display());

    let mut controller = EqController::headless(config);
    controller.set_bands(load_bands(bands)?);
    controller.load_file(&std::fs::read(input)?)?;

    let bytes = controller.export()?;
    std::fs::write(output, &bytes)?;

    let checksum = sha256_hex(&bytes);
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    println!("sha256 {}", checksum);
    Ok(checksum)
}

/// Evaluate the composite curve of a band collection
pub fn response(config: EngineConfig, bands: Option<&Path>, points: usize) -> Result<ResponseCurve> {
    let mut controller = EqController::headless(config);
    controller.set_bands(load_bands(bands)?);
    let grid = log_frequency_grid(points, MIN_FREQUENCY, MAX_FREQUENCY);
    Ok(controller.response().curve(&grid))
}

/// Print a curve as a table or JSON
pub fn print_response(curve: &ResponseCurve, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(curve)?);
        return Ok(());
    }

    println!("{:>10}  {:>9}  {:>9}", "freq (Hz)", "static", "dynamic");
    for point in &curve.points {
        println!(
            "{:>10.1}  {:>+9.2}  {:>+9.2}",
            point.frequency, point.static_db, point.dynamic_db
        );
    }
    Ok(())
}

/// Write the default preset as JSON
pub fn preset(output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&default_bands())?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Preset written: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{encode_wav, AudioBuffer, Decoder, WavDecoder};
    use tempfile::tempdir;

    #[test]
    fn test_load_bands_default() {
        let bands = load_bands(None).unwrap();
        assert_eq!(bands.len(), 5);
    }

    #[test]
    fn test_preset_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preset.json");
        preset(Some(&path)).unwrap();
        let bands = load_bands(Some(&path)).unwrap();
        assert_eq!(bands, default_bands());
    }

    #[test]
    fn test_render_writes_wav() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let source = AudioBuffer::from_channels(vec![vec![0.25; 480], vec![-0.25; 480]], 48000);
        std::fs::write(&input, encode_wav(&source).unwrap()).unwrap();

        let checksum = render(EngineConfig::default(), &input, None, &output).unwrap();
        let written = std::fs::read(&output).unwrap();
        assert_eq!(checksum, sha256_hex(&written));

        let decoded = WavDecoder.decode(&written).unwrap();
        assert_eq!(decoded.num_channels(), 2);
        assert_eq!(decoded.num_frames(), 480);
    }

    #[test]
    fn test_response_flat_preset() {
        let curve = response(EngineConfig::default(), None, 16).unwrap();
        assert_eq!(curve.points.len(), 16);
        assert!(curve.max_abs_static_db() < 1e-6);
    }
}
