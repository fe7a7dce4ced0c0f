//! PCM WAV decode/encode on top of `hound`.
//!
//! Decoding accepts integer PCM at 8 bits (unsigned) or 16 bits (signed),
//! any channel count and any sample rate. Encoding always writes 16-bit
//! signed little-endian PCM with a canonical 44-byte header whose fields are
//! taken from the buffer itself; forcing the VOX target format is the
//! normaliser's job, not the codec's.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::AudioBuffer;
use crate::error::{Result, VoxError};

/// Largest positive value a sample may have before scaling to i16.
const MAX_POSITIVE: f64 = 32_767.0 / 32_768.0;

/// Decode a complete WAV byte stream.
///
/// # Errors
/// - `VoxError::Format` on a malformed container.
/// - `VoxError::UnsupportedFormat` for float PCM or widths other than 8/16 bits.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(malformed)?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int {
        return Err(VoxError::UnsupportedFormat(
            "floating-point PCM is not supported".into(),
        ));
    }
    if spec.channels == 0 {
        return Err(VoxError::Format("channel count is zero".into()));
    }

    let samples: Vec<f64> = match spec.bits_per_sample {
        // hound hands 8-bit data back already shifted to signed (v - 128).
        8 => reader
            .samples::<i16>()
            .map(|s| s.map(|v| unsigned_to_f64((v + 128) as u8)))
            .collect::<std::result::Result<_, _>>()
            .map_err(malformed)?,
        16 => reader
            .samples::<i16>()
            .map(|s| s.map(signed_to_f64))
            .collect::<std::result::Result<_, _>>()
            .map_err(malformed)?,
        bits => {
            return Err(VoxError::UnsupportedFormat(format!(
                "sample width {bits} bits (expected 8 or 16)"
            )))
        }
    };

    if samples.len() % spec.channels as usize != 0 {
        return Err(VoxError::Format(format!(
            "{} samples do not divide into {} channels",
            samples.len(),
            spec.channels
        )));
    }

    Ok(AudioBuffer::new(
        spec.channels,
        spec.bits_per_sample / 8,
        spec.sample_rate,
        samples,
    ))
}

/// Reading from memory cannot fail for I/O reasons, so an I/O error from
/// the reader means the data ran out early.
fn malformed(e: hound::Error) -> VoxError {
    match e {
        hound::Error::IoError(io) => VoxError::Format(format!("truncated WAV data: {io}")),
        other => other.into(),
    }
}

/// Read and decode a WAV file.
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode a buffer as 16-bit PCM WAV.
///
/// # Errors
/// Returns `VoxError::Format` if the buffer has no channels or a zero rate.
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    if buffer.channels == 0 || buffer.sample_rate == 0 {
        return Err(VoxError::Format(format!(
            "cannot encode {} channel(s) at {} Hz",
            buffer.channels, buffer.sample_rate
        )));
    }

    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + buffer.samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &buffer.samples {
            writer.write_sample(quantize(sample))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Map an unsigned 8-bit sample to [-1.0, 1.0].
pub fn unsigned_to_f64(v: u8) -> f64 {
    v as f64 / 127.5 - 1.0
}

/// Map a signed 16-bit sample to [-1.0, 1.0).
pub fn signed_to_f64(s: i16) -> f64 {
    s as f64 / 32_768.0
}

/// Convert a float sample to 16-bit PCM, saturating instead of wrapping.
pub fn quantize(sample: f64) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    // `as` on floats saturates at the integer bounds.
    (sample.clamp(-1.0, MAX_POSITIVE) * 32_768.0).round() as i16
}
