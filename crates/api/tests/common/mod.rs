//! Shared harness for API integration tests.
//!
//! Builds the production router over in-memory collaborators, so tests need
//! neither Postgres nor S3 nor the image model.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use moodboard_api::auth::jwt::{generate_access_token, JwtConfig};
use moodboard_api::config::{SchedulerBackend, SchedulerConfig, ServerConfig};
use moodboard_api::router::build_app_router;
use moodboard_api::state::AppState;
use moodboard_core::types::DbId;
use moodboard_db::memory::MemoryCollageStore;
use moodboard_events::EventBus;
use moodboard_imagegen::{GeneratedImage, GenerationRequest, GeneratorError, ImageGenerator};
use moodboard_pipeline::{CollageService, TokioScheduler};
use moodboard_storage::memory::MemoryBlobStore;
use moodboard_storage::BlobStore;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Key of the outfit photo uploaded by [`TestApp::upload_reference`].
pub const REFERENCE_KEY: &str = "uploads/outfit-photo";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        scheduler: SchedulerConfig {
            backend: SchedulerBackend::Tokio,
            poll_interval_ms: 1000,
            batch_size: 8,
        },
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Returns a tiny fixed PNG.
pub struct StubGenerator;

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        Ok(GeneratedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".into(),
        })
    }
}

/// Always fails the way a rejected provider request does.
pub struct FailingGenerator;

#[async_trait]
impl ImageGenerator for FailingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        Err(GeneratorError::Blocked("SAFETY".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub service: Arc<CollageService>,
    pub store: Arc<MemoryCollageStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub config: ServerConfig,
    scheduled: UnboundedReceiver<DbId>,
}

impl TestApp {
    /// A clone of the router, ready for a `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// A valid bearer token for `user_id`.
    pub fn token(&self, user_id: DbId) -> String {
        generate_access_token(user_id, &self.config.jwt).expect("token generation should succeed")
    }

    /// Put an outfit photo at [`REFERENCE_KEY`], as a client upload would.
    pub async fn upload_reference(&self) {
        self.blobs
            .put(REFERENCE_KEY, vec![0xFF, 0xD8, 0xFF], "image/jpeg")
            .await
            .expect("memory put should succeed");
    }

    /// Run every generation task scheduled so far, like the worker would.
    pub async fn run_scheduled(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(collage_id) = self.scheduled.try_recv() {
            self.service.run_generation(collage_id).await;
            ran += 1;
        }
        ran
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(Arc::new(StubGenerator))
}

/// Build the full application router over in-memory collaborators and the
/// given generator.
pub fn build_test_app_with(generator: Arc<dyn ImageGenerator>) -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryCollageStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let events = Arc::new(EventBus::default());
    let (scheduler, scheduled) = TokioScheduler::new();

    let service = Arc::new(CollageService::new(
        store.clone(),
        blobs.clone(),
        generator,
        Arc::new(scheduler),
        events.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        collages: Arc::clone(&service),
        events,
    };

    TestApp {
        router: build_app_router(state, &config),
        service,
        store,
        blobs,
        config,
        scheduled,
    }
}

/// Serve `app` on an ephemeral local port for clients that need a real
/// socket, such as WebSocket upgrades.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind an ephemeral port");
    let addr = listener.local_addr().expect("listener should have an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
