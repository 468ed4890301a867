//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use webobs_api::AppState;
use webobs_core::config::AppConfig;
use webobs_relay::RelayEngine;
use webobs_relay::listener::{self, Listener};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The relay engine behind the router
    pub engine: RelayEngine,
    /// Asset directory for bound tags
    pub assets: tempfile::TempDir,
}

impl TestApp {
    /// Create a new test application with a fresh engine and asset directory
    pub fn new() -> Self {
        let config = AppConfig::default();
        let engine = RelayEngine::start(&config.relay);
        let state = AppState::new(config, engine.clone());
        let assets = tempfile::tempdir().expect("Failed to create asset dir");

        Self {
            router: webobs_api::build_app(state),
            engine,
            assets,
        }
    }

    /// Bind `tag` to the test asset directory
    pub fn bind(&self, tag: &str, listener: Option<Arc<dyn Listener>>) {
        self.engine
            .bind(tag, listener, self.assets.path())
            .expect("Failed to bind tag");
    }

    /// Write a file into the asset directory
    pub fn write_asset(&self, name: &str, contents: &str) {
        let path = self.assets.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create asset subdir");
        }
        std::fs::write(path, contents).expect("Failed to write asset");
    }

    /// Make a GET request through the router
    pub async fn get(&self, path: &str) -> TestResponse {
        let req = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            text: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    /// Serve the router on an ephemeral local port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });
        addr
    }

    /// Poll until `tag` has `count` sessions
    pub async fn wait_for_sessions(&self, tag: &str, count: usize) {
        for _ in 0..200 {
            if self.engine.registry().session_count(tag) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} sessions on '{tag}', found {}",
            self.engine.registry().session_count(tag)
        );
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header, empty if absent
    pub content_type: String,
    /// Body as text
    pub text: String,
}

impl TestResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).expect("Body is not JSON")
    }
}

/// Listener that records every `(tag, payload)` it is called with
pub fn recording_listener() -> (Arc<dyn Listener>, Arc<Mutex<Vec<(String, String)>>>) {
    let heard = Arc::new(Mutex::new(Vec::new()));
    let log = heard.clone();
    let listener = listener::from_fn(move |tag, data| {
        log.lock()
            .unwrap()
            .push((tag.to_string(), String::from_utf8_lossy(data).into_owned()));
    });
    (listener, heard)
}
