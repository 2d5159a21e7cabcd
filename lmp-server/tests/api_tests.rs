//! Integration tests for lmp-server routing: health, build info, UI and
//! fallbacks

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, TestApp};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lmp-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = TestApp::new();
    let response = app.get("/api/buildinfo").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_index_served_at_root() {
    let app = TestApp::new();
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<title>Local Media Player</title>"));
}

#[tokio::test]
async fn test_static_assets() {
    let app = TestApp::new();

    let css = app.get("/static/app.css").await;
    assert_eq!(css.status(), StatusCode::OK);
    assert!(css.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/css"));

    for script in ["api.js", "player.js", "files.js", "playlists.js", "bluetooth.js", "app.js"] {
        let response = app.get(&format!("/static/js/{}", script)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", script);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript"));
    }

    assert_eq!(app.get("/static/js/missing.js").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_routes_fall_back_to_index() {
    let app = TestApp::new();
    let response = app.get("/playlists/some-id").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Local Media Player"));
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let app = TestApp::new();
    let response = app.get("/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = TestApp::new();
    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.com")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_event_stream_opens() {
    let app = TestApp::new();
    let response = app.get("/api/events").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}
