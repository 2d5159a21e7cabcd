//! HTTP API handlers for lmp-server

pub mod bluetooth;
pub mod buildinfo;
pub mod extract;
pub mod files;
pub mod health;
pub mod playlists;
pub mod sse;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use sse::event_stream;
pub use ui::{serve_app_css, serve_index, serve_script, spa_fallback};

use axum::Router;

use crate::AppState;

/// Everything mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    use axum::routing::get;

    Router::new()
        .merge(files::routes())
        .merge(playlists::routes())
        .merge(bluetooth::routes())
        .route("/events", get(event_stream))
        .route("/buildinfo", get(get_build_info))
        .fallback(ui::api_not_found)
}
