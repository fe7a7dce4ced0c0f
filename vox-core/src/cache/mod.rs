//! On-disk phrase cache: one `<cache_dir>/<phrase_id>.wav` per phrase.
//!
//! A stored file is served as-is until it is explicitly invalidated; clip
//! contents are never re-checked. Builds for the same phrase id are
//! serialised through [`KeyedLocks`], and a caller that waited on an
//! in-flight build picks up that build's file instead of starting another.
//! Files are written via temp + rename, so a half-written entry is never
//! visible.

pub mod keyed_lock;

pub use keyed_lock::KeyedLocks;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    engine::PhraseBuilder,
    error::{Result, VoxError},
    persist::write_atomic,
    phrase::is_slug,
};

/// A stored phrase result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub phrase_id: String,
    pub file_path: PathBuf,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicUsize,
    builds: AtomicUsize,
    build_errors: AtomicUsize,
    invalidations: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: usize,
    pub builds: usize,
    pub build_errors: usize,
    pub invalidations: usize,
}

pub struct PhraseCache {
    dir: PathBuf,
    builder: Arc<dyn PhraseBuilder>,
    locks: KeyedLocks,
    entries: RwLock<HashMap<String, CacheEntry>>,
    counters: CacheCounters,
}

impl PhraseCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>, builder: Arc<dyn PhraseBuilder>) -> Self {
        Self {
            dir: dir.into(),
            builder,
            locks: KeyedLocks::new(),
            entries: RwLock::new(HashMap::new()),
            counters: CacheCounters::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the entry for `phrase_id` lives (whether or not it exists).
    pub fn path_for(&self, phrase_id: &str) -> PathBuf {
        self.dir.join(format!("{phrase_id}.wav"))
    }

    /// Return the stored audio for `phrase_id`, building and storing it first
    /// if there is none.
    ///
    /// # Errors
    /// Whatever the builder returns; nothing is stored on failure.
    pub fn get_or_build(
        &self,
        phrase_id: &str,
        clip_paths: &[PathBuf],
        silence_ms: u32,
    ) -> Result<Vec<u8>> {
        self.get_or_build_current(phrase_id, clip_paths, silence_ms, || true)
    }

    /// Like [`get_or_build`](Self::get_or_build), but the fresh result is only
    /// stored if `is_current()` still holds once the build has finished under
    /// the key lock. Otherwise the bytes are returned to this caller and
    /// nothing is written.
    pub fn get_or_build_current(
        &self,
        phrase_id: &str,
        clip_paths: &[PathBuf],
        silence_ms: u32,
        is_current: impl Fn() -> bool,
    ) -> Result<Vec<u8>> {
        check_id(phrase_id)?;
        let path = self.path_for(phrase_id);

        if let Some(bytes) = read_if_present(&path)? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(phrase_id, "phrase cache hit");
            return Ok(bytes);
        }

        self.locks.with_lock(phrase_id, || {
            // Someone may have finished the build while we waited.
            if let Some(bytes) = read_if_present(&path)? {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(phrase_id, "phrase cache hit after wait");
                return Ok(bytes);
            }

            let bytes = match self.builder.build(clip_paths, silence_ms) {
                Ok(b) => b,
                Err(e) => {
                    self.counters.build_errors.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            };
            self.counters.builds.fetch_add(1, Ordering::Relaxed);

            if !is_current() {
                debug!(phrase_id, "definition changed during build, result not stored");
                return Ok(bytes);
            }
            write_atomic(&path, &bytes)?;
            self.entries.write().insert(
                phrase_id.to_string(),
                CacheEntry {
                    phrase_id: phrase_id.to_string(),
                    file_path: path.clone(),
                    built_at: Utc::now(),
                },
            );
            info!(phrase_id, bytes = bytes.len(), "phrase cached");
            Ok(bytes)
        })
    }

    /// Metadata for a stored entry. Files left by an earlier process report
    /// their modification time as `built_at`.
    pub fn entry(&self, phrase_id: &str) -> Option<CacheEntry> {
        let path = self.path_for(phrase_id);
        let meta = fs::metadata(&path).ok().filter(|m| m.is_file())?;

        if let Some(entry) = self.entries.read().get(phrase_id) {
            return Some(entry.clone());
        }

        let built_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Some(CacheEntry {
            phrase_id: phrase_id.to_string(),
            file_path: path,
            built_at,
        })
    }

    /// Remove the stored entry for `phrase_id`. Waits for any in-flight build
    /// of that id so its result cannot resurrect the entry afterwards.
    pub fn invalidate(&self, phrase_id: &str) -> Result<()> {
        check_id(phrase_id)?;
        let path = self.path_for(phrase_id);
        self.locks.with_lock(phrase_id, || {
            self.entries.write().remove(phrase_id);
            remove_if_present(&path)?;
            self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(phrase_id, "phrase cache entry invalidated");
            Ok(())
        })
    }

    /// Remove every stored `*.wav`. Phrase entries go through
    /// [`invalidate`](Self::invalidate); other wav files are deleted directly.
    pub fn invalidate_all(&self) -> Result<()> {
        let (ids, foreign) = self.scan()?;
        for id in &ids {
            self.invalidate(id)?;
        }
        for path in &foreign {
            remove_if_present(path)?;
        }
        self.entries.write().clear();
        info!(removed = ids.len() + foreign.len(), "phrase cache cleared");
        Ok(())
    }

    /// Ids with a stored file, sorted.
    pub fn stored_ids(&self) -> Result<Vec<String>> {
        Ok(self.scan()?.0)
    }

    /// Wav files in the cache dir, split into phrase ids and anything else.
    fn scan(&self) -> Result<(Vec<String>, Vec<PathBuf>)> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Default::default()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        let mut foreign = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            let is_wav = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s == "wav")
                .unwrap_or(false);
            if !is_wav || !path.is_file() {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_slug(stem) => ids.push(stem.to_string()),
                _ => {
                    debug!(path = %path.display(), "non-phrase wav in cache dir");
                    foreign.push(path);
                }
            }
        }
        ids.sort();
        Ok((ids, foreign))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            builds: self.counters.builds.load(Ordering::Relaxed),
            build_errors: self.counters.build_errors.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for PhraseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhraseCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

fn check_id(phrase_id: &str) -> Result<()> {
    if is_slug(phrase_id) {
        Ok(())
    } else {
        Err(VoxError::InvalidConfig(format!(
            "phrase id '{phrase_id}' must match [a-z0-9_]+"
        )))
    }
}

fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
