//! Phrase building.
//!
//! ## Pipeline (per build)
//!
//! ```text
//! clip paths ──► read + decode ──► normalise to TargetFormat ──► append
//!                                                                  │
//!                                     silence gap between clips ◄──┘
//!                                                                  │
//!                                                      encode once ▼
//!                                                          WAV bytes
//! ```
//!
//! Builds are all-or-nothing: the first clip that fails to read or decode
//! aborts the build and no output is produced.
//!
//! The `PhraseBuilder` trait is the seam the phrase cache builds through, so
//! tests can count or fake builds without touching audio.

pub mod concat;

pub use concat::ConcatEngine;

use std::path::PathBuf;

use crate::error::Result;

/// Anything that can turn an ordered clip list into one WAV byte stream.
pub trait PhraseBuilder: Send + Sync + 'static {
    /// Build a phrase from `clip_paths`, inserting `silence_ms` of silence
    /// between consecutive clips.
    ///
    /// # Errors
    /// - `VoxError::EmptyInput` when `clip_paths` is empty.
    /// - `VoxError::MissingClip`, `VoxError::Format`, `VoxError::Io`, … for
    ///   the first clip that cannot be used.
    fn build(&self, clip_paths: &[PathBuf], silence_ms: u32) -> Result<Vec<u8>>;
}
