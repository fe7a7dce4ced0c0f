//! Service configuration.
//!
//! Serialised as camelCase JSON. Unknown or missing fields fall back to the
//! defaults below, and `normalize()` clamps values into sane ranges.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::phrase::{ClipRef, PhraseDefinition};

pub const DEFAULT_SILENCE_MS: u32 = 150;
pub const MAX_SILENCE_MS: u32 = 5_000;
pub const DEFAULT_AUTO_FETCH: bool = true;
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/sourcesounds/hl1/archive/refs/heads/master.zip";
pub const DEFAULT_ARCHIVE_PREFIX: &str = "hl1-master/sound/vox/";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct VoxConfig {
    /// Directory holding `<clip>.wav` files.
    pub sounds_dir: PathBuf,
    /// Directory holding `<phrase_id>.wav` results.
    pub cache_dir: PathBuf,
    /// Silence inserted between consecutive clips.
    pub silence_ms: u32,
    /// Download the clip archive when `sounds_dir` has no clips.
    pub auto_fetch: bool,
    pub archive_url: String,
    /// Only archive entries under this path are extracted.
    pub archive_prefix: String,
    pub fetch_timeout_secs: u64,
    /// Phrase id → ordered clip names.
    pub phrases: BTreeMap<String, Vec<ClipRef>>,
}

impl Default for VoxConfig {
    fn default() -> Self {
        let base = PathBuf::from("hl_vox");
        Self {
            sounds_dir: base.join("sounds"),
            cache_dir: base.join("cache"),
            silence_ms: DEFAULT_SILENCE_MS,
            auto_fetch: DEFAULT_AUTO_FETCH,
            archive_url: DEFAULT_ARCHIVE_URL.into(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.into(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            phrases: BTreeMap::new(),
        }
    }
}

impl VoxConfig {
    /// Defaults rooted at `base` (`<base>/sounds`, `<base>/cache`).
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            sounds_dir: base.join("sounds"),
            cache_dir: base.join("cache"),
            ..Self::default()
        }
    }

    pub fn normalize(&mut self) {
        self.silence_ms = self.silence_ms.min(MAX_SILENCE_MS);
        self.fetch_timeout_secs = self.fetch_timeout_secs.clamp(1, 3_600);
        self.archive_url = self.archive_url.trim().to_string();
        if self.archive_url.is_empty() {
            self.archive_url = DEFAULT_ARCHIVE_URL.into();
        }
        self.archive_prefix = self.archive_prefix.trim().to_string();
        if self.archive_prefix.is_empty() {
            self.archive_prefix = DEFAULT_ARCHIVE_PREFIX.into();
        }
        self.phrases = std::mem::take(&mut self.phrases)
            .into_iter()
            .map(|(id, clips)| (id.trim().to_string(), clips))
            .collect();
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Validate every configured phrase.
    ///
    /// # Errors
    /// `VoxError::InvalidConfig` for the first phrase that fails validation.
    pub fn phrase_definitions(&self) -> Result<Vec<PhraseDefinition>> {
        self.phrases
            .iter()
            .map(|(id, clips)| PhraseDefinition::new(id.clone(), clips.clone()))
            .collect()
    }
}
