//! lmp-server library - local media player
//!
//! Browses music folders, streams audio with range support, keeps playlists
//! in a JSON file and drives the Bluetooth adapter for audio output.

use axum::Router;
use lmp_common::config::Settings;
use lmp_common::EventBus;
use std::sync::Arc;

pub mod api;
pub mod bluetooth;
pub mod error;
pub mod library;
pub mod metadata;
pub mod playlists;
pub mod streaming;

use bluetooth::{BluetoothService, CommandRunner};
use library::Library;
use playlists::PlaylistStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub playlists: Arc<PlaylistStore>,
    pub bluetooth: BluetoothService,
    pub events: EventBus,
}

impl AppState {
    /// Wire up services from resolved settings
    ///
    /// `runner` executes the Bluetooth tools; tests pass a fake.
    pub fn new(settings: &Settings, runner: Arc<dyn CommandRunner>) -> Self {
        let events = EventBus::default();
        Self {
            library: Arc::new(Library::from_settings(settings)),
            playlists: Arc::new(PlaylistStore::new(settings.playlists_path())),
            bluetooth: BluetoothService::new(runner, settings.bluetooth.clone(), events.clone()),
            events,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let ui = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.css", get(api::serve_app_css))
        .route("/static/js/:name", get(api::serve_script));

    Router::new()
        .nest("/api", api::api_routes())
        .merge(api::health_routes())
        .merge(ui)
        .fallback(api::spa_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
