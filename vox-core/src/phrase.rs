//! Phrase definitions and the registry that owns them.
//!
//! A phrase is an ordered list of clip names. Names are validated once, when
//! a definition is created, and resolved to files under the sounds directory
//! only when a phrase is actually built.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxError};

/// Reference to a single clip file, by stem (no `.wav` extension).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ClipRefRepr", into = "String")]
pub struct ClipRef {
    pub name: String,
}

/// Accepted on-disk shapes: `"doop"` or `{ "name": "doop" }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClipRefRepr {
    Bare(String),
    Object { name: String },
}

impl From<ClipRefRepr> for ClipRef {
    fn from(repr: ClipRefRepr) -> Self {
        match repr {
            ClipRefRepr::Bare(name) | ClipRefRepr::Object { name } => ClipRef::new(name),
        }
    }
}

impl From<ClipRef> for String {
    fn from(clip: ClipRef) -> Self {
        clip.name
    }
}

impl ClipRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }

    /// Path of this clip inside `sounds_dir`.
    pub fn path_in(&self, sounds_dir: &Path) -> PathBuf {
        sounds_dir.join(format!("{}.wav", self.name))
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VoxError::InvalidConfig("empty clip name".into()));
        }
        if self.name.contains(['/', '\\']) || self.name.contains("..") {
            return Err(VoxError::InvalidConfig(format!(
                "clip name '{}' must be a bare file stem",
                self.name
            )));
        }
        Ok(())
    }
}

/// A validated phrase: slug id plus ordered clip sequence (repeats allowed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseDefinition {
    id: String,
    clips: Vec<ClipRef>,
}

impl PhraseDefinition {
    /// # Errors
    /// `VoxError::InvalidConfig` if the id is not a slug, the sequence is
    /// empty, or a clip name is not a bare stem.
    pub fn new(id: impl Into<String>, clips: Vec<ClipRef>) -> Result<Self> {
        let id = id.into();
        if !is_slug(&id) {
            return Err(VoxError::InvalidConfig(format!(
                "phrase id '{id}' must match [a-z0-9_]+"
            )));
        }
        if clips.is_empty() {
            return Err(VoxError::InvalidConfig(format!("phrase '{id}' has no clips")));
        }
        for clip in &clips {
            clip.validate()?;
        }
        Ok(Self { id, clips })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn clips(&self) -> &[ClipRef] {
        &self.clips
    }

    /// Resolve every clip to an existing file under `sounds_dir`.
    ///
    /// # Errors
    /// `VoxError::MissingClip` naming the first clip whose file is absent.
    pub fn resolve_clips(&self, sounds_dir: &Path) -> Result<Vec<PathBuf>> {
        resolve_clips(&self.clips, sounds_dir)
    }
}

/// Resolve clip refs to paths, failing on the first one that is not a file.
pub fn resolve_clips(clips: &[ClipRef], sounds_dir: &Path) -> Result<Vec<PathBuf>> {
    clips
        .iter()
        .map(|clip| {
            let path = clip.path_in(sounds_dir);
            if path.is_file() {
                Ok(path)
            } else {
                Err(VoxError::MissingClip {
                    name: clip.name.clone(),
                })
            }
        })
        .collect()
}

/// `[a-z0-9_]+`
pub fn is_slug(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Current set of phrase definitions, keyed by id.
#[derive(Debug, Default)]
pub struct PhraseRegistry {
    phrases: RwLock<BTreeMap<String, PhraseDefinition>>,
}

impl PhraseRegistry {
    pub fn new(defs: impl IntoIterator<Item = PhraseDefinition>) -> Self {
        let registry = Self::default();
        registry.replace_all(defs);
        registry
    }

    pub fn get(&self, id: &str) -> Option<PhraseDefinition> {
        self.phrases.read().get(id).cloned()
    }

    /// Whether `def` is still the registered definition for its id.
    pub fn holds(&self, def: &PhraseDefinition) -> bool {
        self.phrases.read().get(&def.id) == Some(def)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.phrases.read().contains_key(id)
    }

    /// Phrase ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.phrases.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.phrases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.read().is_empty()
    }

    /// Swap in a whole new set of definitions.
    ///
    /// Returns the ids whose clip sequence changed or that were removed; their
    /// cached audio is stale.
    pub fn replace_all(&self, defs: impl IntoIterator<Item = PhraseDefinition>) -> Vec<String> {
        let next: BTreeMap<String, PhraseDefinition> =
            defs.into_iter().map(|d| (d.id.clone(), d)).collect();

        let mut guard = self.phrases.write();
        let mut stale = BTreeSet::new();
        for (id, old) in guard.iter() {
            if next.get(id) != Some(old) {
                stale.insert(id.clone());
            }
        }
        // Ids that are new may still have a file on disk from an earlier run.
        for id in next.keys() {
            if !guard.contains_key(id) {
                stale.insert(id.clone());
            }
        }
        *guard = next;
        stale.into_iter().collect()
    }

    /// Insert or replace one definition. Returns `true` if it changed.
    pub fn upsert(&self, def: PhraseDefinition) -> bool {
        let mut guard = self.phrases.write();
        let changed = guard.get(&def.id) != Some(&def);
        guard.insert(def.id.clone(), def);
        changed
    }

    /// Remove one definition. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.phrases.write().remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, clips: &[&str]) -> PhraseDefinition {
        PhraseDefinition::new(id, clips.iter().map(|c| ClipRef::new(*c)).collect()).unwrap()
    }

    #[test]
    fn clip_refs_accept_both_shapes() {
        let clips: Vec<ClipRef> =
            serde_json::from_str(r#"["doop", {"name": "alert"}, " buzwarn "]"#).unwrap();
        assert_eq!(
            clips,
            vec![ClipRef::new("doop"), ClipRef::new("alert"), ClipRef::new("buzwarn")]
        );
        let json = serde_json::to_string(&clips).unwrap();
        assert_eq!(json, r#"["doop","alert","buzwarn"]"#);
    }

    #[test]
    fn invalid_definitions_rejected() {
        assert!(PhraseDefinition::new("Bad-Id", vec![ClipRef::new("a")]).is_err());
        assert!(PhraseDefinition::new("ok", vec![]).is_err());
        assert!(PhraseDefinition::new("ok", vec![ClipRef::new("../etc/passwd")]).is_err());
        assert!(PhraseDefinition::new("ok", vec![ClipRef::new("")]).is_err());
        assert!(PhraseDefinition::new("ok_1", vec![ClipRef::new("a"), ClipRef::new("a")]).is_ok());
    }

    #[test]
    fn resolve_reports_first_missing_clip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doop.wav"), b"x").unwrap();
        let d = def("test", &["doop", "nope", "alsonope"]);
        match d.resolve_clips(dir.path()) {
            Err(VoxError::MissingClip { name }) => assert_eq!(name, "nope"),
            other => panic!("expected MissingClip, got {other:?}"),
        }
        let ok = def("test", &["doop", "doop"]).resolve_clips(dir.path()).unwrap();
        assert_eq!(ok, vec![dir.path().join("doop.wav"), dir.path().join("doop.wav")]);
    }

    #[test]
    fn replace_all_reports_changed_removed_and_new_ids() {
        let registry = PhraseRegistry::new([def("a", &["x"]), def("b", &["y"]), def("c", &["z"])]);
        let stale = registry.replace_all([def("a", &["x"]), def("b", &["y", "y"]), def("d", &["w"])]);
        assert_eq!(stale, vec!["b".to_string(), "c".to_string(), "d".to_string()]);
        assert_eq!(registry.ids(), vec!["a", "b", "d"]);
        assert!(!registry.contains("c"));
    }

    #[test]
    fn upsert_and_remove() {
        let registry = PhraseRegistry::default();
        assert!(registry.upsert(def("a", &["x"])));
        assert!(!registry.upsert(def("a", &["x"])));
        assert!(registry.upsert(def("a", &["x", "y"])));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.is_empty());
    }
}
