//! # vox-core
//!
//! Builds Half-Life style "VOX" announcements by joining short pre-recorded
//! word clips into one WAV.
//!
//! ## Architecture
//!
//! ```text
//! VoxService ──► PhraseRegistry (id → clip list)
//!     │
//!     ├──► PhraseCache ── per-id lock ──► ConcatEngine
//!     │        │                            │
//!     │   <cache>/<id>.wav        codec::decode → normalize → resample
//!     │                                     │
//!     │                          silence gaps, codec::encode (once)
//!     │
//!     └──► AssetFetcher ──► ArchiveSource (HTTP zip) → filter_and_flatten
//! ```
//!
//! Every phrase is rendered as mono 16-bit PCM at 11025 Hz regardless of
//! the clip formats it is built from.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod assets;
pub mod audio;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod persist;
pub mod phrase;
pub mod service;

// Convenience re-exports for downstream crates
pub use audio::{AudioBuffer, TargetFormat};
pub use cache::{CacheEntry, CacheStats, PhraseCache};
pub use config::VoxConfig;
pub use engine::{ConcatEngine, PhraseBuilder};
pub use error::{Result, VoxError};
pub use phrase::{ClipRef, PhraseDefinition, PhraseRegistry};
pub use service::{PhraseMedia, VoxService};

#[cfg(feature = "fetch")]
pub use assets::HttpArchiveSource;
