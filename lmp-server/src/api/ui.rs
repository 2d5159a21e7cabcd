//! Embedded single-page UI

use axum::{
    extract::Path,
    http::{header, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};

use crate::error::ApiError;

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const APP_CSS: &str = include_str!("../../ui/app.css");

const SCRIPTS: &[(&str, &str)] = &[
    ("api.js", include_str!("../../ui/js/api.js")),
    ("player.js", include_str!("../../ui/js/player.js")),
    ("files.js", include_str!("../../ui/js/files.js")),
    ("playlists.js", include_str!("../../ui/js/playlists.js")),
    ("bluetooth.js", include_str!("../../ui/js/bluetooth.js")),
    ("app.js", include_str!("../../ui/js/app.js")),
];

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/app.css
pub async fn serve_app_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        APP_CSS,
    )
        .into_response()
}

/// GET /static/js/:name
pub async fn serve_script(Path(name): Path<String>) -> Response {
    match SCRIPTS.iter().find(|(file, _)| *file == name) {
        Some((_, body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            *body,
        )
            .into_response(),
        None => ApiError::not_found("Not found").into_response(),
    }
}

/// Client-side routes get the app shell; anything else is a 404
pub async fn spa_fallback(method: Method, uri: Uri) -> Response {
    if method == Method::GET && !uri.path().starts_with("/api/") && !uri.path().starts_with("/static/") {
        Html(INDEX_HTML).into_response()
    } else {
        ApiError::not_found("Not found").into_response()
    }
}

/// Unknown routes under `/api`
pub async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}
