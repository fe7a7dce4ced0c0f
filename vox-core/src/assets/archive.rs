//! Zip handling for the clip archive.
//!
//! `filter_and_flatten` is pure: it takes `(entry name, bytes)` pairs and
//! returns the clip files to write, keyed by bare file name. Reading the zip
//! and writing the files are separate steps around it.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Result, VoxError};
use crate::persist::write_atomic;

/// Per-entry size guard; VOX clips are a few kilobytes each.
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Whether `path` names a clip file (`*.wav`, case-insensitive).
pub fn is_clip_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Read every file entry of a zip archive held in memory.
///
/// # Errors
/// `VoxError::Format` if the archive or an entry cannot be read.
pub fn read_zip_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| VoxError::Format(format!("failed to read zip archive: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| VoxError::Format(format!("zip entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        let mut raw = Vec::new();
        (&mut entry).take(MAX_ENTRY_BYTES + 1).read_to_end(&mut raw)?;
        if raw.len() as u64 > MAX_ENTRY_BYTES {
            return Err(VoxError::Format(format!(
                "zip entry '{name}' exceeds {MAX_ENTRY_BYTES} bytes"
            )));
        }
        entries.push((name, raw));
    }
    Ok(entries)
}

/// Keep entries under `prefix` and flatten each to its base name.
///
/// Directory entries and the prefix itself are skipped. When two entries
/// flatten to the same name, the later one wins.
pub fn filter_and_flatten<I>(entries: I, prefix: &str) -> BTreeMap<String, Vec<u8>>
where
    I: IntoIterator<Item = (String, Vec<u8>)>,
{
    let mut out = BTreeMap::new();
    for (name, bytes) in entries {
        let Some(inner) = name.strip_prefix(prefix) else {
            continue;
        };
        let inner = inner.trim_start_matches('/');
        if inner.is_empty() || name.ends_with('/') {
            continue;
        }
        let Some(base) = Path::new(inner).file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if base == ".." || base == "." {
            continue;
        }
        out.insert(base.to_string(), bytes);
    }
    out
}

/// Write flattened files into `dir`, overwriting same-named files.
/// Returns the number written.
pub fn write_flattened(dir: &Path, files: &BTreeMap<String, Vec<u8>>) -> Result<usize> {
    std::fs::create_dir_all(dir)?;
    for (name, bytes) in files {
        write_atomic(&dir.join(name), bytes)?;
    }
    Ok(files.len())
}
