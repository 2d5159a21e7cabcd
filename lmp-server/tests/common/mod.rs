//! Shared helpers for lmp-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use axum::{
    body::Body,
    http::{Request, Response},
};
use lmp_common::config::{BluetoothConfig, RootFolderInitializer, Settings};
use lmp_common::Result;
use lmp_server::bluetooth::{CommandOutput, CommandRunner, LineStream};
use lmp_server::{build_router, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

/// Canned bluetoothctl/rfkill output keyed by the joined arguments
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    scan_lines: Vec<String>,
    hold_scan_open: bool,
}

impl FakeRunner {
    /// Lines the fake `bluetoothctl scan on` prints before exiting
    pub fn with_scan_lines(lines: Vec<String>) -> Self {
        Self {
            scan_lines: lines,
            ..Default::default()
        }
    }

    /// A scan that prints `lines` and then keeps running until stopped
    pub fn with_open_scan(lines: Vec<String>) -> Self {
        Self {
            scan_lines: lines,
            hold_scan_open: true,
            ..Default::default()
        }
    }

    pub fn respond(&self, args: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(args.to_string(), stdout.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let key = args.join(" ");
        self.calls.lock().unwrap().push(format!("{} {}", program, key));
        let stdout = self.responses.lock().unwrap().get(&key).cloned().unwrap_or_default();
        Ok(CommandOutput {
            success: true,
            stdout,
            stderr: String::new(),
        })
    }

    async fn spawn_lines(&self, program: &str, args: &[&str]) -> Result<LineStream> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));
        let lines = futures::stream::iter(self.scan_lines.clone());
        if self.hold_scan_open {
            Ok(Box::pin(lines.chain(futures::stream::pending())))
        } else {
            Ok(Box::pin(lines))
        }
    }
}

pub const POWERED_ON: &str = "Controller DC:A6:32:01:02:03 (public)\n\tName: pi\n\tPowered: yes\n";
pub const POWERED_OFF: &str = "Controller DC:A6:32:01:02:03 (public)\n\tName: pi\n\tPowered: no\n";

/// A server over a throwaway root folder
pub struct TestApp {
    pub root: TempDir,
    pub state: AppState,
    pub runner: Arc<FakeRunner>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_runner(FakeRunner::default())
    }

    pub fn with_runner(runner: FakeRunner) -> Self {
        let root = TempDir::new().unwrap();
        let settings = Settings {
            root_folder: root.path().to_path_buf(),
            bind: "127.0.0.1".to_string(),
            port: 0,
            music_dirs: vec![root.path().join("music")],
            restrict_paths: true,
            audio_extensions: vec!["mp3".to_string(), "flac".to_string()],
            log_level: "info".to_string(),
            bluetooth: BluetoothConfig::default(),
        };
        RootFolderInitializer::new(settings.root_folder.clone())
            .ensure_layout()
            .unwrap();

        let runner = Arc::new(runner);
        let state = AppState::new(&settings, runner.clone());
        Self { root, state, runner }
    }

    pub fn music_dir(&self) -> std::path::PathBuf {
        self.root.path().join("music")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        build_router(self.state.clone()).oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST with no body and no content type
    pub async fn post_empty(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Should parse JSON")
}

/// Percent-encode a path for a query string
pub fn encode(path: &std::path::Path) -> String {
    let mut out = String::new();
    for b in path.to_string_lossy().bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
