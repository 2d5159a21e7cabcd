//! Playlist CRUD

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use lmp_common::{time, LmpEvent};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::extract::JsonBody;
use crate::error::{ApiContext, ApiError, ApiResult};
use crate::playlists::{NewPlaylist, Playlist, PlaylistDocument, PlaylistUpdate, Track};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AddTrackRequest {
    pub track: Option<Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/playlists", get(list_playlists).post(create_playlist))
        .route(
            "/playlists/:id",
            get(get_playlist).put(update_playlist).delete(delete_playlist),
        )
        .route("/playlists/:id/tracks", post(add_track))
        .route("/playlists/:id/tracks/:index", delete(remove_track))
}

fn notify(state: &AppState, playlist_id: &str) {
    state.events.emit(LmpEvent::PlaylistsChanged {
        playlist_id: Some(playlist_id.to_string()),
        timestamp: time::now(),
    });
}

/// GET /api/playlists
pub async fn list_playlists(State(state): State<AppState>) -> ApiResult<Json<PlaylistDocument>> {
    let doc = state
        .playlists
        .list()
        .await
        .api_context("Error reading playlists")?;
    Ok(Json(doc))
}

/// GET /api/playlists/:id
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Playlist>> {
    let playlist = state
        .playlists
        .get(&id)
        .await
        .api_context("Error reading playlist")?;
    Ok(Json(playlist))
}

/// POST /api/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewPlaylist>,
) -> ApiResult<impl IntoResponse> {
    let playlist = state
        .playlists
        .create(request)
        .await
        .api_context("Error creating playlist")?;
    notify(&state, &playlist.id);
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// PUT /api/playlists/:id
pub async fn update_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<PlaylistUpdate>,
) -> ApiResult<Json<Playlist>> {
    let playlist = state
        .playlists
        .update(&id, update)
        .await
        .api_context("Error updating playlist")?;
    notify(&state, &id);
    Ok(Json(playlist))
}

/// POST /api/playlists/:id/tracks
pub async fn add_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<AddTrackRequest>,
) -> ApiResult<Json<Playlist>> {
    let track = Track::from_json(request.track).api_context("Error adding track")?;
    let (playlist, added) = state
        .playlists
        .add_track(&id, track)
        .await
        .api_context("Error adding track")?;
    if added {
        notify(&state, &id);
    }
    Ok(Json(playlist))
}

/// DELETE /api/playlists/:id/tracks/:index
pub async fn remove_track(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
) -> ApiResult<Json<Playlist>> {
    let index: i64 = index
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid track index"))?;
    let playlist = state
        .playlists
        .remove_track(&id, index)
        .await
        .api_context("Error removing track")?;
    notify(&state, &id);
    Ok(Json(playlist))
}

/// DELETE /api/playlists/:id
pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .playlists
        .delete(&id)
        .await
        .api_context("Error deleting playlist")?;
    notify(&state, &id);
    Ok(Json(json!({ "success": true })))
}
