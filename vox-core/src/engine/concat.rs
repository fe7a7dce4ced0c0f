//! `ConcatEngine`: decode, normalise and join clips into one WAV.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use super::PhraseBuilder;
use crate::{
    audio::{codec, normalize::normalize, TargetFormat},
    config::MAX_SILENCE_MS,
    error::{Result, VoxError},
    persist::write_atomic,
};

/// The concatenation engine. Always renders [`TargetFormat::VOX`]: the
/// normaliser only produces mono and the codec only writes 16-bit.
/// Stateless, so one instance can serve any number of concurrent builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatEngine {
    target: TargetFormat,
}

impl ConcatEngine {
    pub const fn new() -> Self {
        Self {
            target: TargetFormat::VOX,
        }
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Build the phrase and return its normalised samples without encoding.
    /// Gaps longer than [`MAX_SILENCE_MS`] are shortened to it.
    pub fn build_samples(&self, clip_paths: &[PathBuf], silence_ms: u32) -> Result<Vec<f64>> {
        if clip_paths.is_empty() {
            return Err(VoxError::EmptyInput);
        }

        let gap = self.target.silence_frames(silence_ms.min(MAX_SILENCE_MS));
        let mut out: Vec<f64> = Vec::new();

        for (i, path) in clip_paths.iter().enumerate() {
            let bytes = read_clip(path)?;
            let clip = codec::decode(&bytes)?;
            debug!(
                clip = %path.display(),
                channels = clip.channels,
                width = clip.sample_width_bytes,
                rate = clip.sample_rate,
                frames = clip.frames(),
                "decoded clip"
            );
            out.extend(normalize(&clip, &self.target)?);

            if i + 1 < clip_paths.len() {
                out.resize(out.len() + gap, 0.0);
            }
        }

        Ok(out)
    }

    /// Build the phrase and write it to `output`, replacing it atomically.
    pub fn build_to_file(&self, clip_paths: &[PathBuf], silence_ms: u32, output: &Path) -> Result<()> {
        let bytes = self.build(clip_paths, silence_ms)?;
        write_atomic(output, &bytes)?;
        Ok(())
    }
}

impl PhraseBuilder for ConcatEngine {
    fn build(&self, clip_paths: &[PathBuf], silence_ms: u32) -> Result<Vec<u8>> {
        let started = Instant::now();
        let samples = self.build_samples(clip_paths, silence_ms)?;
        let frames = samples.len();
        let bytes = codec::encode(&self.target.buffer(samples))?;
        info!(
            clips = clip_paths.len(),
            frames,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "phrase built"
        );
        Ok(bytes)
    }
}

/// Read one clip, turning "not found" into `MissingClip` named by its stem.
fn read_clip(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            VoxError::MissingClip {
                name: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            }
        } else {
            VoxError::Io(e)
        }
    })
}
