//! File browsing, scanning and audio streaming

use axum::{
    extract::{Query, Request, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::JsonBody;
use crate::error::{ApiContext, ApiResult};
use crate::library::{Listing, PathKind, ScanReport};
use crate::metadata::TrackMetadata;
use crate::streaming;
use crate::AppState;

/// `?path=` on file routes
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DirectoriesResponse {
    pub directories: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/files/directories", get(list_directories))
        .route("/files/browse", get(browse))
        .route("/files/metadata", get(metadata))
        .route("/files/scan", post(scan))
        .route("/files/stream", get(stream))
}

/// GET /api/files/directories
pub async fn list_directories(State(state): State<AppState>) -> Json<DirectoriesResponse> {
    let directories = state
        .library
        .directories()
        .into_iter()
        .map(|d| d.to_string_lossy().to_string())
        .collect();
    Json(DirectoriesResponse { directories })
}

/// GET /api/files/browse?path=
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Listing>> {
    let listing = state
        .library
        .browse(query.path.as_deref())
        .await
        .api_context("Error browsing files")?;
    Ok(Json(listing))
}

/// GET /api/files/metadata?path=
pub async fn metadata(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<TrackMetadata>> {
    let meta = state
        .library
        .metadata(query.path.as_deref())
        .await
        .api_context("Error getting metadata")?;
    Ok(Json(meta))
}

/// POST /api/files/scan
///
/// The body is optional; without it the default music folder is scanned.
pub async fn scan(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ScanRequest>,
) -> ApiResult<Json<ScanReport>> {
    let report = state
        .library
        .scan(request.path.as_deref())
        .await
        .api_context("Error scanning directory")?;
    Ok(Json(report))
}

/// GET /api/files/stream?path=
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    request: Request,
) -> ApiResult<Response> {
    let path = state
        .library
        .resolve(query.path.as_deref(), PathKind::File)
        .api_context("Error streaming file")?;
    Ok(streaming::serve_file(&path, request).await)
}
