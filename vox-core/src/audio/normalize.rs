//! Bring an arbitrary decoded clip to the target format.
//!
//! Steps: stereo → mono (average of each frame pair), then rate conversion.
//! The result stays in `f64`; it is only quantised when the finished phrase
//! is encoded.

use tracing::debug;

use super::{resample::RateConverter, AudioBuffer, TargetFormat};
use crate::error::{Result, VoxError};

/// Normalise `buffer` into mono samples at `target.sample_rate`.
///
/// # Errors
/// Returns `VoxError::UnsupportedFormat` for channel counts other than 1 or 2.
pub fn normalize(buffer: &AudioBuffer, target: &TargetFormat) -> Result<Vec<f64>> {
    let mono = downmix(buffer)?;
    let rc = RateConverter::new(buffer.sample_rate, target.sample_rate);
    if !rc.is_passthrough() {
        debug!(
            from = buffer.sample_rate,
            to = target.sample_rate,
            frames = mono.len(),
            "resampling clip"
        );
    }
    Ok(rc.process(&mono).into_owned())
}

/// Collapse interleaved stereo to mono. Mono input is copied through.
pub fn downmix(buffer: &AudioBuffer) -> Result<Vec<f64>> {
    match buffer.channels {
        1 => Ok(buffer.samples.clone()),
        2 => Ok(buffer
            .samples
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect()),
        n => Err(VoxError::UnsupportedFormat(format!(
            "{n} channels (expected mono or stereo)"
        ))),
    }
}
