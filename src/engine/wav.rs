//! WAV encode/decode
//!
//! Export always writes canonical 16-bit PCM: a 44-byte header (no
//! extensible format chunk, whatever the channel count) followed by
//! interleaved little-endian samples. Decoding accepts anything hound can
//! read.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use hound::{SampleFormat, WavReader};
use log::debug;
use sha2::{Digest, Sha256};

use super::buffer::AudioBuffer;
use crate::error::{EqError, Result};

/// Size of the canonical header in bytes
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Quantize one float sample to 16-bit
///
/// Samples are clamped to [-1, 1]. Values where `0.5 + sample < 0` scale
/// by 32768, everything else by 32767, truncating toward zero.
pub fn quantize_sample(sample: f32) -> i16 {
    let s = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    if 0.5 + s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Header fields of a canonical 16-bit PCM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WavHeader {
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    data_len: u32,
    riff_len: u32,
}

impl WavHeader {
    /// Compute header fields, failing when the shape does not fit the format
    fn for_buffer(buffer: &AudioBuffer) -> Result<Self> {
        let too_large = |field: &str| EqError::Render {
            reason: format!(
                "{} channels x {} frames at {} Hz overflows the WAV {} field",
                buffer.num_channels(),
                buffer.num_frames(),
                buffer.sample_rate,
                field
            ),
        };

        let channels =
            u16::try_from(buffer.num_channels()).map_err(|_| too_large("channel count"))?;
        let block_align = channels
            .checked_mul(BYTES_PER_SAMPLE)
            .ok_or_else(|| too_large("block align"))?;
        let byte_rate = buffer
            .sample_rate
            .checked_mul(block_align as u32)
            .ok_or_else(|| too_large("byte rate"))?;
        let data_len = u32::try_from(buffer.num_frames())
            .ok()
            .and_then(|frames| frames.checked_mul(block_align as u32))
            .ok_or_else(|| too_large("data size"))?;
        let riff_len = data_len
            .checked_add(WAV_HEADER_LEN as u32 - 8)
            .ok_or_else(|| too_large("RIFF size"))?;

        Ok(Self {
            channels,
            sample_rate: buffer.sample_rate,
            byte_rate,
            block_align,
            data_len,
            riff_len,
        })
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(b"RIFF")?;
        w.write_u32::<LittleEndian>(self.riff_len)?;
        w.write_all(b"WAVE")?;

        w.write_all(b"fmt ")?;
        w.write_u32::<LittleEndian>(FMT_CHUNK_LEN)?;
        w.write_u16::<LittleEndian>(FORMAT_PCM)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.sample_rate)?;
        w.write_u32::<LittleEndian>(self.byte_rate)?;
        w.write_u16::<LittleEndian>(self.block_align)?;
        w.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

        w.write_all(b"data")?;
        w.write_u32::<LittleEndian>(self.data_len)?;
        Ok(())
    }
}

/// Encode a buffer as a canonical 16-bit PCM WAV file in memory
///
/// Buffers whose size cannot be described by the 32-bit RIFF header fail
/// with `EqError::Render`.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let header = WavHeader::for_buffer(buffer)?;

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + header.data_len as usize);
    header.write(&mut bytes)?;
    for sample in buffer.to_interleaved() {
        bytes.write_i16::<LittleEndian>(quantize_sample(sample))?;
    }

    debug!(
        "Encoded WAV: {} channels, {} frames, {} Hz, {} bytes",
        header.channels,
        buffer.num_frames(),
        header.sample_rate,
        bytes.len()
    );
    Ok(bytes)
}

/// Hex-encoded SHA-256 of encoded bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Turns encoded file bytes into planar float audio
pub trait Decoder: Send {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer>;
}

/// WAV decoder backed by hound
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| EqError::Decode {
            reason: format!("not a readable WAV stream: {}", e),
            source: Some(Box::new(e)),
        })?;

        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(EqError::UnsupportedFormat {
                format: "WAV with zero channels".to_string(),
            });
        }

        let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)?;

        debug!(
            "Decoded WAV: {} channels, {} frames, {} Hz, {}-bit {:?}",
            buffer.num_channels(),
            buffer.num_frames(),
            buffer.sample_rate,
            spec.bits_per_sample,
            spec.sample_format
        );
        Ok(buffer)
    }
}

fn read_samples_as_f32<R: std::io::Read>(
    reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decode_err = |e: hound::Error| EqError::Decode {
        reason: format!("corrupt sample data: {}", e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (format, bits) => Err(EqError::UnsupportedFormat {
            format: format!("{}-bit {:?} WAV", bits, format),
        }),
    }
}
