//! Music folder browsing and scanning
//!
//! Lists configured music folders, reads single directories for the file
//! browser and walks folder trees collecting audio files with their tags.
//! With `restrict_paths` enabled every requested path must resolve to a
//! location inside one of the music folders.

use crate::metadata::{self, TrackMetadata};
use lmp_common::config::Settings;
use lmp_common::{time, Error, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// System entries never reported by a scan
const IGNORED_NAMES: [&str; 5] = [".DS_Store", "Thumbs.db", ".git", ".svn", "node_modules"];

/// What a requested path must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    File,
}

impl PathKind {
    fn not_found(self) -> Error {
        match self {
            PathKind::Directory => Error::NotFound("Directory not found".to_string()),
            PathKind::File => Error::NotFound("File not found".to_string()),
        }
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntryInfo {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Directory listing
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub path: String,
    pub items: Vec<DirEntryInfo>,
}

/// Result of a recursive scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub directory: String,
    pub files: Vec<ScannedTrack>,
}

/// An audio file found by a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScannedTrack {
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<TrackMetadata> for ScannedTrack {
    fn from(m: TrackMetadata) -> Self {
        Self {
            path: m.path,
            title: m.title,
            artist: m.artist,
            album: m.album,
            duration: m.duration,
        }
    }
}

/// Access to the configured music folders
#[derive(Debug, Clone)]
pub struct Library {
    music_dirs: Vec<PathBuf>,
    audio_extensions: Vec<String>,
    restrict_paths: bool,
}

impl Library {
    pub fn new(music_dirs: Vec<PathBuf>, audio_extensions: Vec<String>, restrict_paths: bool) -> Self {
        Self {
            music_dirs,
            audio_extensions,
            restrict_paths,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.music_dirs.clone(),
            settings.audio_extensions.clone(),
            settings.restrict_paths,
        )
    }

    /// Music folders that currently exist
    pub fn directories(&self) -> Vec<PathBuf> {
        self.music_dirs.iter().filter(|d| d.is_dir()).cloned().collect()
    }

    /// Folder shown when no path is requested
    pub fn default_dir(&self) -> Option<PathBuf> {
        self.directories()
            .into_iter()
            .next()
            .or_else(|| self.music_dirs.first().cloned())
    }

    /// True if the extension is one of the configured audio extensions
    pub fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .map(|ext| self.audio_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }

    /// Resolve a requested path to an existing file or directory
    ///
    /// `None` (or an empty string) means the default music folder.
    pub fn resolve(&self, requested: Option<&str>, kind: PathKind) -> Result<PathBuf> {
        let path = match requested.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => PathBuf::from(p),
            None => self.default_dir().ok_or_else(|| kind.not_found())?,
        };

        let exists = match kind {
            PathKind::Directory => path.is_dir(),
            PathKind::File => path.is_file(),
        };
        if !exists {
            return Err(kind.not_found());
        }

        if self.restrict_paths {
            self.check_allowed(&path)?;
        }
        Ok(path)
    }

    fn check_allowed(&self, path: &Path) -> Result<()> {
        let canonical = std::fs::canonicalize(path)?;
        let allowed = self
            .music_dirs
            .iter()
            .filter_map(|dir| std::fs::canonicalize(dir).ok())
            .any(|root| canonical.starts_with(root));

        if allowed {
            Ok(())
        } else {
            warn!("Rejected path outside music directories: {}", path.display());
            Err(Error::Forbidden("Path outside music directories".to_string()))
        }
    }

    /// List a directory, folders first then by name
    pub async fn browse(&self, requested: Option<&str>) -> Result<Listing> {
        let dir = self.resolve(requested, PathKind::Directory)?;

        let mut items = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // Follows symlinks; broken links are skipped
            let meta = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            items.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path: path.to_string_lossy().to_string(),
                is_directory: meta.is_dir(),
                size: meta.len(),
                modified: meta
                    .modified()
                    .ok()
                    .map(|t| time::to_rfc3339(time::from_system_time(t))),
            });
        }

        items.sort_by(compare_entries);
        debug!("Listed {} entries in {}", items.len(), dir.display());

        Ok(Listing {
            path: dir.to_string_lossy().to_string(),
            items,
        })
    }

    /// Recursively collect audio files with their tags
    pub async fn scan(&self, requested: Option<&str>) -> Result<ScanReport> {
        let dir = self.resolve(requested, PathKind::Directory)?;
        let library = self.clone();
        let root = dir.clone();

        let files = tokio::task::spawn_blocking(move || library.scan_blocking(&root))
            .await
            .map_err(|e| Error::Internal(format!("Scan task failed: {}", e)))?;

        Ok(ScanReport {
            directory: dir.to_string_lossy().to_string(),
            files,
        })
    }

    fn scan_blocking(&self, root: &Path) -> Vec<ScannedTrack> {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_ignored(e));

        let mut paths = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && self.is_audio_file(entry.path()) => {
                    paths.push(entry.into_path());
                }
                Ok(_) => {}
                // Unreadable folders and symlink loops don't abort the scan
                Err(e) => warn!("Error accessing entry: {}", e),
            }
        }
        paths.sort();

        debug!("Scan of {} found {} audio files", root.display(), paths.len());

        paths
            .iter()
            .map(|p| metadata::read_metadata_or_fallback(p).into())
            .collect()
    }

    /// Tags for one file
    pub async fn metadata(&self, requested: Option<&str>) -> Result<TrackMetadata> {
        let path = self.resolve(requested, PathKind::File)?;
        tokio::task::spawn_blocking(move || metadata::read_metadata(&path))
            .await
            .map_err(|e| Error::Internal(format!("Metadata task failed: {}", e)))?
    }
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| IGNORED_NAMES.contains(&name))
            .unwrap_or(false)
}

fn compare_entries(a: &DirEntryInfo, b: &DirEntryInfo) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
