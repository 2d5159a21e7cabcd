//! JSON-backed playlist store
//!
//! The whole store is one document, `{"playlists": [...]}`, rewritten on
//! every change. Operations are serialized by an async mutex so concurrent
//! requests never lose each other's updates, and writes go through a temp
//! file plus rename so a crash never leaves a truncated document.

use lmp_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A playlist entry
///
/// Only `path` is required. Any extra fields sent by the UI are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            artist: None,
            album: None,
            duration: None,
            extra: Map::new(),
        }
    }

    /// Validate an untyped track object from a request body
    pub fn from_json(value: Option<Value>) -> Result<Self> {
        let invalid = || Error::InvalidInput("Valid track object with path is required".to_string());
        let value = value.ok_or_else(invalid)?;
        let has_path = value
            .get("path")
            .and_then(Value::as_str)
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false);
        if !has_path {
            return Err(invalid());
        }
        serde_json::from_value(value).map_err(|_| invalid())
    }
}

/// A named, ordered list of tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// The on-disk document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDocument {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

impl PlaylistDocument {
    fn position(&self, id: &str) -> Result<usize> {
        self.playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound("Playlist not found".to_string()))
    }
}

/// Fields accepted when creating a playlist
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlaylist {
    pub name: Option<String>,
    pub tracks: Option<Vec<Track>>,
}

/// Fields accepted when updating a playlist
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub tracks: Option<Vec<Track>>,
}

/// Read-modify-write access to the playlist document
#[derive(Debug)]
pub struct PlaylistStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PlaylistStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document
    pub async fn list(&self) -> Result<PlaylistDocument> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn get(&self, id: &str) -> Result<Playlist> {
        let doc = self.list().await?;
        let index = doc.position(id)?;
        Ok(doc.playlists[index].clone())
    }

    pub async fn create(&self, request: NewPlaylist) -> Result<Playlist> {
        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::InvalidInput("Playlist name is required".to_string()))?;

        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            name,
            tracks: request.tracks.unwrap_or_default(),
            created_at: time::now_rfc3339(),
            updated_at: None,
        };

        let created = playlist.clone();
        self.mutate(move |doc| {
            doc.playlists.push(playlist);
            Ok(((), true))
        })
        .await?;

        info!("Created playlist {} ({})", created.name, created.id);
        Ok(created)
    }

    /// Replace name and/or tracks; an empty name is ignored
    pub async fn update(&self, id: &str, update: PlaylistUpdate) -> Result<Playlist> {
        self.mutate(|doc| {
            let index = doc.position(id)?;
            let playlist = &mut doc.playlists[index];
            if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
                playlist.name = name;
            }
            if let Some(tracks) = update.tracks {
                playlist.tracks = tracks;
            }
            playlist.updated_at = Some(time::now_rfc3339());
            Ok((playlist.clone(), true))
        })
        .await
    }

    /// Append a track unless one with the same path is already present
    ///
    /// The flag is false when the track was already there.
    pub async fn add_track(&self, id: &str, track: Track) -> Result<(Playlist, bool)> {
        self.mutate(|doc| {
            let index = doc.position(id)?;
            let playlist = &mut doc.playlists[index];
            if playlist.tracks.iter().any(|t| t.path == track.path) {
                debug!("Track {} already in playlist {}", track.path, id);
                return Ok(((playlist.clone(), false), false));
            }
            playlist.tracks.push(track);
            playlist.updated_at = Some(time::now_rfc3339());
            Ok(((playlist.clone(), true), true))
        })
        .await
    }

    /// Remove the track at `track_index`; negative or past-the-end indexes
    /// are "Track not found"
    pub async fn remove_track(&self, id: &str, track_index: i64) -> Result<Playlist> {
        self.mutate(|doc| {
            let index = doc.position(id)?;
            let playlist = &mut doc.playlists[index];
            let Some(track_index) = usize::try_from(track_index)
                .ok()
                .filter(|i| *i < playlist.tracks.len())
            else {
                return Err(Error::NotFound("Track not found".to_string()));
            };
            playlist.tracks.remove(track_index);
            playlist.updated_at = Some(time::now_rfc3339());
            Ok((playlist.clone(), true))
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.mutate(|doc| {
            let index = doc.position(id)?;
            let removed = doc.playlists.remove(index);
            info!("Deleted playlist {} ({})", removed.name, removed.id);
            Ok(((), true))
        })
        .await
    }

    /// Apply `f` under the lock; the bool it returns says whether to save
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PlaylistDocument) -> Result<(T, bool)>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.read().await?;
        let (value, changed) = f(&mut doc)?;
        if changed {
            self.write(&doc).await?;
        }
        Ok(value)
    }

    async fn read(&self) -> Result<PlaylistDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PlaylistDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, doc: &PlaylistDocument) -> Result<()> {
        let mut json = serde_json::to_string_pretty(doc)?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, PlaylistStore) {
        let dir = TempDir::new().unwrap();
        let store = PlaylistStore::new(dir.path().join("playlists.json"));
        (dir, store)
    }

    fn named(name: &str) -> NewPlaylist {
        NewPlaylist {
            name: Some(name.to_string()),
            tracks: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let (_dir, store) = store();
        assert!(store.list().await.unwrap().playlists.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (_dir, store) = store();
        let err = store.create(named("   ")).await.unwrap_err();
        assert_eq!(err.detail(), "Playlist name is required");
        let err = store.create(NewPlaylist::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_persists_pretty_json() {
        let (_dir, store) = store();
        let created = store.create(named("Road Trip")).await.unwrap();
        assert!(created.tracks.is_empty());
        assert!(created.updated_at.is_none());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("{\n  \"playlists\": ["));
        assert!(raw.contains("\"createdAt\""));
        assert!(!raw.contains("updatedAt"));

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_add_track_deduplicates_by_path() {
        let (_dir, store) = store();
        let playlist = store.create(named("Mix")).await.unwrap();

        let (updated, added) = store.add_track(&playlist.id, Track::new("/m/a.mp3")).await.unwrap();
        assert!(added);
        assert_eq!(updated.tracks.len(), 1);
        assert!(updated.updated_at.is_some());

        let (again, added) = store.add_track(&playlist.id, Track::new("/m/a.mp3")).await.unwrap();
        assert!(!added);
        assert_eq!(again.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_track_bounds() {
        let (_dir, store) = store();
        let playlist = store
            .create(NewPlaylist {
                name: Some("Two".to_string()),
                tracks: Some(vec![Track::new("/a.mp3"), Track::new("/b.mp3")]),
            })
            .await
            .unwrap();

        let err = store.remove_track(&playlist.id, 2).await.unwrap_err();
        assert_eq!(err.detail(), "Track not found");
        let err = store.remove_track(&playlist.id, -1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err = store.remove_track("nope", -1).await.unwrap_err();
        assert_eq!(err.detail(), "Playlist not found");

        let updated = store.remove_track(&playlist.id, 0).await.unwrap();
        assert_eq!(updated.tracks, vec![Track::new("/b.mp3")]);
    }

    #[tokio::test]
    async fn test_update_ignores_empty_name() {
        let (_dir, store) = store();
        let playlist = store.create(named("Keep Me")).await.unwrap();

        let updated = store
            .update(
                &playlist.id,
                PlaylistUpdate {
                    name: Some(String::new()),
                    tracks: Some(vec![Track::new("/x.mp3")]),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Keep Me");
        assert_eq!(updated.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_names_are_stored_as_sent() {
        let (_dir, store) = store();
        let created = store.create(named("  Late Night ")).await.unwrap();
        assert_eq!(created.name, "  Late Night ");

        let updated = store
            .update(
                &created.id,
                PlaylistUpdate {
                    name: Some(" Early ".to_string()),
                    tracks: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, " Early ");

        let updated = store
            .update(
                &created.id,
                PlaylistUpdate {
                    name: Some("   ".to_string()),
                    tracks: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, " Early ");
    }

    #[tokio::test]
    async fn test_delete_and_unknown_ids() {
        let (_dir, store) = store();
        let playlist = store.create(named("Gone")).await.unwrap();
        store.delete(&playlist.id).await.unwrap();

        for err in [
            store.get(&playlist.id).await.unwrap_err(),
            store.delete(&playlist.id).await.unwrap_err(),
            store.add_track("nope", Track::new("/a.mp3")).await.unwrap_err(),
        ] {
            assert_eq!(err.detail(), "Playlist not found");
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_not_lost() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(named(&format!("p{}", i))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list().await.unwrap().playlists.len(), 10);
    }

    #[test]
    fn test_track_from_json_validation() {
        assert!(Track::from_json(None).is_err());
        assert!(Track::from_json(Some(json!({"title": "no path"}))).is_err());
        assert!(Track::from_json(Some(json!({"path": "  "}))).is_err());

        let track = Track::from_json(Some(json!({
            "path": "/m/a.mp3",
            "title": "A",
            "rating": 5
        })))
        .unwrap();
        assert_eq!(track.title.as_deref(), Some("A"));
        assert_eq!(track.extra["rating"], json!(5));

        // Extra fields survive a round trip through the store format
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["rating"], json!(5));
    }

    #[tokio::test]
    async fn test_existing_documents_with_numeric_style_ids_load() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"playlists":[{"id":"1700000000000","name":"Old","tracks":[{"path":"/a.mp3","artist":"X"}],"createdAt":"2023-11-14T22:13:20.000Z"}]}"#,
        )
        .unwrap();

        let playlist = store.get("1700000000000").await.unwrap();
        assert_eq!(playlist.tracks[0].artist.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.list().await.unwrap_err(), Error::Json(_)));
    }
}
