//! Audio file streaming with HTTP range support
//!
//! The browser's media element seeks by issuing `Range: bytes=` requests.
//! `ServeFile` answers a satisfiable single range with 206 and anything it
//! cannot serve with 416. Content-Type is guessed from the extension.

use axum::{body::Body, extract::Request, response::Response};
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

/// Serve `path` for `request`, honouring its Range and conditional headers
pub async fn serve_file(path: &Path, request: Request) -> Response {
    debug!(
        path = %path.display(),
        range = ?request.headers().get(axum::http::header::RANGE),
        "Streaming file"
    );
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
