//! Browse/resolve helpers for hosts that expose phrases as playable media.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxError};

pub const AUDIO_CONTENT_TYPE: &str = "audio/wav";

/// Route under which a host serves phrase audio.
pub const AUDIO_ROUTE_PREFIX: &str = "/api/hl_vox/audio/";

/// One playable phrase, as listed to a media browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseMedia {
    pub id: String,
    pub title: String,
    pub content_type: String,
}

impl PhraseMedia {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: phrase_title(id),
            content_type: AUDIO_CONTENT_TYPE.into(),
        }
    }
}

/// `"intruder_alert"` → `"Intruder Alert"`.
pub fn phrase_title(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute URL of a phrase's audio under `base_url`.
///
/// # Errors
/// `VoxError::NotConfigured` when `base_url` is blank.
pub fn media_url(base_url: &str, phrase_id: &str) -> Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(VoxError::NotConfigured);
    }
    Ok(format!("{base}{AUDIO_ROUTE_PREFIX}{phrase_id}"))
}
