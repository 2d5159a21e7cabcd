//! Audio tag extraction using lofty
//!
//! Missing tags fall back to the file stem for the title and to
//! "Unknown Artist" / "Unknown Album".

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use lmp_common::{Error, Result};
use serde::Serialize;
use std::path::Path;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Tags and duration of one audio file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub path: String,
}

impl TrackMetadata {
    /// Metadata derived from the path alone
    pub fn from_path(path: &Path) -> Self {
        Self {
            title: file_stem(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            year: None,
            duration: None,
            path: path.to_string_lossy().to_string(),
        }
    }
}

/// Read tags and duration; blocking, call from `spawn_blocking`
pub fn read_metadata(path: &Path) -> Result<TrackMetadata> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::Internal(format!("{}: {}", path.display(), e)))?
        .read()
        .map_err(|e| Error::Internal(format!("{}: {}", path.display(), e)))?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    let mut metadata = TrackMetadata::from_path(path);
    metadata.duration = (duration > 0.0).then_some(duration);

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        if let Some(title) = non_empty(tag.title()) {
            metadata.title = title;
        }
        if let Some(artist) = non_empty(tag.artist()) {
            metadata.artist = artist;
        }
        if let Some(album) = non_empty(tag.album()) {
            metadata.album = album;
        }
        metadata.year = tag.year();
    }

    tracing::debug!(
        file = %path.display(),
        title = %metadata.title,
        duration_s = ?metadata.duration,
        "Extracted metadata"
    );

    Ok(metadata)
}

/// Like [`read_metadata`] but never fails
pub fn read_metadata_or_fallback(path: &Path) -> TrackMetadata {
    read_metadata(path).unwrap_or_else(|e| {
        tracing::warn!("Error processing {}: {}", path.display(), e);
        TrackMetadata::from_path(path)
    })
}

fn non_empty(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
