//! Sample-rate conversion by linear interpolation.
//!
//! ## Design
//!
//! VOX clips are short, low-bandwidth speech recorded at a handful of rates
//! (8 kHz, 11.025 kHz, 22.05 kHz). A linear interpolator is plenty for that
//! material; it is not band-limited, so some aliasing is expected.
//!
//! The whole clip is converted in one pass: output index `i` reads the source
//! at `i * (len - 1) / max(new_len - 1, 1)`, so the first and last samples
//! line up exactly.
//!
//! When `from == to`, `RateConverter` is a zero-copy passthrough.
//!
//! ## Usage
//!
//! ```ignore
//! let rc = RateConverter::new(8_000, 11_025);
//! let out = rc.process(&samples); // Cow<[f64]> at 11.025 kHz
//! ```
//!
//! A zero source or target rate yields an empty output.

use std::borrow::Cow;

/// Converts mono `f64` audio from one fixed sample rate to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConverter {
    from_rate: u32,
    to_rate: u32,
}

impl RateConverter {
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        Self { from_rate, to_rate }
    }

    /// Returns `true` when no conversion takes place.
    pub fn is_passthrough(&self) -> bool {
        self.from_rate == self.to_rate
    }

    /// Output length for `input_len` source samples.
    pub fn output_len(&self, input_len: usize) -> usize {
        if self.is_passthrough() {
            return input_len;
        }
        if self.from_rate == 0 || self.to_rate == 0 {
            return 0;
        }
        (input_len as f64 * self.to_rate as f64 / self.from_rate as f64).round() as usize
    }

    /// Resample `samples`. Passthrough borrows the input.
    pub fn process<'a>(&self, samples: &'a [f64]) -> Cow<'a, [f64]> {
        if self.is_passthrough() {
            return Cow::Borrowed(samples);
        }

        let new_len = self.output_len(samples.len());
        if new_len == 0 || samples.is_empty() {
            return Cow::Owned(Vec::new());
        }

        let last = samples.len() - 1;
        let step = last as f64 / (new_len - 1).max(1) as f64;

        let out = (0..new_len)
            .map(|i| {
                let pos = i as f64 * step;
                let lo = (pos.floor() as usize).min(last);
                let hi = (lo + 1).min(last);
                let frac = pos - lo as f64;
                samples[lo] + (samples[hi] - samples[lo]) * frac
            })
            .collect();

        Cow::Owned(out)
    }
}

/// One-shot convenience wrapper around [`RateConverter`].
pub fn resample(samples: &[f64], from_rate: u32, to_rate: u32) -> Cow<'_, [f64]> {
    RateConverter::new(from_rate, to_rate).process(samples)
}
