//! Sample-level audio handling: WAV codec, resampler and clip normaliser.
//!
//! All intermediate audio is kept as `f64` in [-1.0, 1.0]. Quantisation to
//! 16-bit PCM happens exactly once, when the final phrase is encoded.

pub mod codec;
pub mod normalize;
pub mod resample;

/// Decoded PCM audio in normalised floating-point form.
///
/// `samples` is interleaved; its length is always a multiple of `channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved channel count (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Width of one source sample in bytes (1 or 2).
    pub sample_width_bytes: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved samples in [-1.0, 1.0].
    pub samples: Vec<f64>,
}

impl AudioBuffer {
    pub fn new(channels: u16, sample_width_bytes: u16, sample_rate: u32, samples: Vec<f64>) -> Self {
        Self {
            channels,
            sample_width_bytes,
            sample_rate,
            samples,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The canonical PCM format every phrase is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub channels: u16,
    pub sample_width_bytes: u16,
    pub sample_rate: u32,
}

impl TargetFormat {
    /// Mono, 16-bit, 11025 Hz.
    pub const VOX: TargetFormat = TargetFormat {
        channels: 1,
        sample_width_bytes: 2,
        sample_rate: 11_025,
    };

    /// Number of zero frames for a gap of `silence_ms` at this rate.
    pub fn silence_frames(&self, silence_ms: u32) -> usize {
        (self.sample_rate as f64 * silence_ms as f64 / 1000.0).round() as usize
    }

    /// Wrap already-normalised mono samples in a buffer of this format.
    pub fn buffer(&self, samples: Vec<f64>) -> AudioBuffer {
        AudioBuffer::new(self.channels, self.sample_width_bytes, self.sample_rate, samples)
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self::VOX
    }
}
