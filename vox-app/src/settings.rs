//! Persistent settings (JSON file in the app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use vox_core::VoxConfig;

pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vox")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("vox")
    }
}

pub fn default_settings_path() -> PathBuf {
    default_data_dir().join("settings.json")
}

/// Load settings, falling back to defaults rooted next to the settings file
/// when it is missing or unreadable.
pub fn load_settings(path: &Path) -> VoxConfig {
    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(default_data_dir);
    let mut config = match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<VoxConfig>(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
                VoxConfig::with_base_dir(&base)
            }
        },
        Err(_) => VoxConfig::with_base_dir(&base),
    };
    config.normalize();
    config
}

pub fn save_settings(path: &Path, config: &VoxConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_core::ClipRef;

    #[test]
    fn missing_file_defaults_next_to_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cfg = load_settings(&path);
        assert_eq!(cfg.sounds_dir, dir.path().join("sounds"));
        assert_eq!(cfg.cache_dir, dir.path().join("cache"));
    }

    #[test]
    fn save_then_load_keeps_phrases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut cfg = VoxConfig::with_base_dir(dir.path());
        cfg.phrases
            .insert("all_clear".into(), vec![ClipRef::new("all"), ClipRef::new("clear")]);
        save_settings(&path, &cfg).unwrap();
        assert_eq!(load_settings(&path), cfg);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let cfg = load_settings(&path);
        assert!(cfg.phrases.is_empty());
        assert_eq!(cfg.sounds_dir, dir.path().join("sounds"));
    }
}
