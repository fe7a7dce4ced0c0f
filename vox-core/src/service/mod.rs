//! `VoxService`: the surface a host (HTTP view, service call, CLI) talks to.
//!
//! ## Lifecycle
//!
//! ```text
//! VoxService::new(config)
//!     └─► ensure_assets()              → sounds dir populated (best-effort)
//!         └─► phrase_audio(id)         → cached or freshly built WAV bytes
//!             └─► set_phrases(defs)    → registry swapped, stale ids invalidated
//! ```
//!
//! Everything here is synchronous and CPU/IO bound. Async hosts use the
//! `*_async` wrappers, which move the work onto Tokio's blocking pool.

pub mod media;

pub use media::{media_url, phrase_title, PhraseMedia};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    assets::{ArchiveSource, AssetFetcher},
    cache::{CacheEntry, CacheStats, PhraseCache},
    config::{VoxConfig, MAX_SILENCE_MS},
    engine::PhraseBuilder,
    error::{Result, VoxError},
    phrase::{resolve_clips, ClipRef, PhraseDefinition, PhraseRegistry},
};

pub struct VoxService {
    config: VoxConfig,
    registry: PhraseRegistry,
    cache: PhraseCache,
    fetcher: AssetFetcher,
}

impl VoxService {
    /// Build a service with the real engine and an HTTP archive source.
    #[cfg(feature = "fetch")]
    pub fn new(config: VoxConfig) -> Result<Self> {
        let source =
            crate::assets::HttpArchiveSource::new(config.archive_url.clone(), config.fetch_timeout());
        Self::with_parts(
            config,
            Arc::new(crate::engine::ConcatEngine::default()),
            Box::new(source),
        )
    }

    /// Build a service from explicit collaborators.
    ///
    /// # Errors
    /// `VoxError::InvalidConfig` if a configured phrase fails validation,
    /// `VoxError::Io` if the cache directory cannot be created.
    pub fn with_parts(
        mut config: VoxConfig,
        builder: Arc<dyn PhraseBuilder>,
        source: Box<dyn ArchiveSource>,
    ) -> Result<Self> {
        config.normalize();
        let defs = config.phrase_definitions()?;
        std::fs::create_dir_all(&config.cache_dir)?;

        let cache = PhraseCache::new(config.cache_dir.clone(), builder);
        let fetcher = AssetFetcher::new(source, config.archive_prefix.clone());
        info!(
            phrases = defs.len(),
            sounds_dir = %config.sounds_dir.display(),
            cache_dir = %config.cache_dir.display(),
            "vox service configured"
        );

        Ok(Self {
            registry: PhraseRegistry::new(defs),
            config,
            cache,
            fetcher,
        })
    }

    pub fn config(&self) -> &VoxConfig {
        &self.config
    }

    pub fn registry(&self) -> &PhraseRegistry {
        &self.registry
    }

    // ── Audio ────────────────────────────────────────────────────────────

    /// Audio for a registered phrase.
    ///
    /// # Errors
    /// - `VoxError::NotFound` for an unknown id.
    /// - `VoxError::NotConfigured` when the sounds directory is missing.
    /// - `VoxError::MissingClip` naming the first absent clip.
    /// - Any build error.
    pub fn phrase_audio(&self, phrase_id: &str) -> Result<Vec<u8>> {
        let def = self
            .registry
            .get(phrase_id)
            .ok_or_else(|| VoxError::NotFound(phrase_id.to_string()))?;
        // A result built from a definition that was replaced meanwhile is
        // handed back to this caller but never cached.
        self.audio_for(def.id(), def.clips(), self.config.silence_ms, || {
            self.registry.holds(&def)
        })
    }

    /// Audio for an ad-hoc clip sequence, cached under `phrase_id`.
    /// `silence_ms` is capped at [`MAX_SILENCE_MS`].
    pub fn get_or_build_phrase_audio(
        &self,
        phrase_id: &str,
        clip_sequence: &[ClipRef],
        silence_ms: u32,
    ) -> Result<Vec<u8>> {
        let def = PhraseDefinition::new(phrase_id, clip_sequence.to_vec())?;
        self.audio_for(def.id(), def.clips(), silence_ms, || true)
    }

    /// `phrase_audio` on Tokio's blocking pool.
    pub async fn phrase_audio_async(self: &Arc<Self>, phrase_id: String) -> Result<Vec<u8>> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.phrase_audio(&phrase_id))
            .await
            .map_err(|e| VoxError::Other(anyhow::anyhow!("phrase build task failed: {e}")))?
    }

    fn audio_for(
        &self,
        phrase_id: &str,
        clips: &[ClipRef],
        silence_ms: u32,
        is_current: impl Fn() -> bool,
    ) -> Result<Vec<u8>> {
        if !self.config.sounds_dir.is_dir() {
            return Err(VoxError::NotConfigured);
        }
        let paths = resolve_clips(clips, &self.config.sounds_dir)?;
        self.cache
            .get_or_build_current(phrase_id, &paths, silence_ms.min(MAX_SILENCE_MS), is_current)
            .inspect_err(|e| error!(phrase_id, error = %e, "failed to build phrase audio"))
    }

    // ── Definitions & cache ──────────────────────────────────────────────

    /// Replace every phrase definition. Entries whose definition changed or
    /// vanished are invalidated; the ids are returned.
    pub fn set_phrases(&self, defs: Vec<PhraseDefinition>) -> Result<Vec<String>> {
        let stale = self.registry.replace_all(defs);
        for id in &stale {
            self.cache.invalidate(id)?;
        }
        info!(invalidated = stale.len(), "phrase definitions replaced");
        Ok(stale)
    }

    /// Insert or replace one definition, invalidating its cached audio if it changed.
    pub fn upsert_phrase(&self, def: PhraseDefinition) -> Result<()> {
        let id = def.id().to_string();
        if self.registry.upsert(def) {
            self.cache.invalidate(&id)?;
        }
        Ok(())
    }

    /// Remove one definition and its cached audio. Returns whether it existed.
    pub fn remove_phrase(&self, phrase_id: &str) -> Result<bool> {
        let existed = self.registry.remove(phrase_id);
        if existed {
            self.cache.invalidate(phrase_id)?;
        }
        Ok(existed)
    }

    pub fn invalidate_phrase(&self, phrase_id: &str) -> Result<()> {
        self.cache.invalidate(phrase_id)
    }

    pub fn invalidate_all_phrases(&self) -> Result<()> {
        self.cache.invalidate_all()
    }

    pub fn cache_entry(&self, phrase_id: &str) -> Option<CacheEntry> {
        self.cache.entry(phrase_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Assets ───────────────────────────────────────────────────────────

    /// Ensure the configured sounds directory has clips.
    pub fn ensure_assets(&self) -> bool {
        self.ensure_assets_in(&self.config.sounds_dir, self.config.auto_fetch)
    }

    pub fn ensure_assets_in(&self, directory: &Path, auto_fetch: bool) -> bool {
        self.fetcher.ensure(directory, auto_fetch)
    }

    /// `ensure_assets` with a caller deadline. On timeout the answer is
    /// `false`; files the background extraction still writes are picked up
    /// by the next call's re-scan.
    pub async fn ensure_assets_async(self: &Arc<Self>, deadline: Duration) -> bool {
        let this = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || this.ensure_assets());
        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(ready)) => ready,
            Ok(Err(e)) => {
                warn!(error = %e, "asset fetch task failed");
                false
            }
            Err(_) => {
                warn!(?deadline, "asset fetch timed out");
                false
            }
        }
    }

    // ── Media browsing ───────────────────────────────────────────────────

    /// Registered phrases, sorted by id.
    pub fn browse(&self) -> Vec<PhraseMedia> {
        self.registry
            .ids()
            .iter()
            .map(|id| PhraseMedia::new(id))
            .collect()
    }

    /// Playable URL for a phrase under the host's `base_url`.
    pub fn resolve_media_url(&self, base_url: &str, phrase_id: &str) -> Result<String> {
        if !self.registry.contains(phrase_id) {
            return Err(VoxError::NotFound(phrase_id.to_string()));
        }
        media_url(base_url, phrase_id)
    }
}

impl std::fmt::Debug for VoxService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxService")
            .field("phrases", &self.registry.len())
            .field("cache", &self.cache)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}
