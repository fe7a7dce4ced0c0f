//! Make sure a local directory of clip files exists.
//!
//! ## Algorithm (`ensure`)
//!
//! 1. Directory already holds at least one `*.wav` → ready, nothing else happens.
//! 2. Auto-fetch disabled → not ready, no side effects.
//! 3. Create the directory, fetch the archive, keep entries under the
//!    configured prefix, flatten them into the directory.
//! 4. Re-scan: ready iff at least one clip file is now present.
//!
//! Fetching is best-effort. Network and extraction failures are logged and
//! reported as "not ready"; they never surface as errors.

pub mod archive;
pub mod source;

pub use archive::{filter_and_flatten, is_clip_file, read_zip_entries};
pub use source::ArchiveSource;

#[cfg(feature = "fetch")]
pub use source::HttpArchiveSource;

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

/// Fetches and unpacks the clip archive on demand.
pub struct AssetFetcher {
    source: Box<dyn ArchiveSource>,
    prefix: String,
}

impl AssetFetcher {
    pub fn new(source: Box<dyn ArchiveSource>, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns whether `directory` holds usable clips afterwards.
    pub fn ensure(&self, directory: &Path, auto_fetch: bool) -> bool {
        if has_clip_files(directory) {
            return true;
        }
        if !auto_fetch {
            info!(dir = %directory.display(), "no clips present and auto-fetch is off");
            return false;
        }

        if let Err(e) = fs::create_dir_all(directory) {
            warn!(dir = %directory.display(), error = %e, "cannot create sounds directory");
            return false;
        }

        let bytes = match self.source.fetch() {
            Ok(b) => b,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "clip archive download failed");
                return false;
            }
        };

        match self.extract(&bytes, directory) {
            Ok(written) => {
                info!(dir = %directory.display(), written, "clip archive extracted");
            }
            Err(e) => {
                warn!(dir = %directory.display(), error = %e, "clip archive extraction failed");
                return false;
            }
        }

        has_clip_files(directory)
    }

    fn extract(&self, bytes: &[u8], directory: &Path) -> Result<usize> {
        let entries = read_zip_entries(bytes)?;
        let files = filter_and_flatten(entries, &self.prefix);
        if files.is_empty() {
            warn!(prefix = %self.prefix, "archive has no entries under prefix");
        }
        archive::write_flattened(directory, &files)
    }
}

impl std::fmt::Debug for AssetFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetFetcher")
            .field("source", &self.source.describe())
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// `true` if `directory` exists and contains at least one clip file.
pub fn has_clip_files(directory: &Path) -> bool {
    let Ok(read_dir) = fs::read_dir(directory) else {
        return false;
    };
    read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .any(|p| p.is_file() && is_clip_file(&p))
}
