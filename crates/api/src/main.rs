use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use moodboard_api::config::{SchedulerBackend, ServerConfig};
use moodboard_api::router::build_app_router;
use moodboard_api::state::AppState;
use moodboard_db::store::PgCollageStore;
use moodboard_events::EventBus;
use moodboard_imagegen::gemini::{GeminiImageGenerator, GeneratorConfig};
use moodboard_pipeline::dispatcher::{run_scheduled_generations, TaskDispatcher};
use moodboard_pipeline::{CollageService, GenerationScheduler, PgTaskQueue, TokioScheduler};
use moodboard_storage::s3::{S3BlobStore, S3Config};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        scheduler = ?config.scheduler.backend,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = moodboard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    moodboard_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    moodboard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let blobs = Arc::new(S3BlobStore::connect(S3Config::from_env()).await);
    let generator = Arc::new(
        GeminiImageGenerator::new(GeneratorConfig::from_env())
            .expect("Failed to build image generator client"),
    );
    let event_bus = Arc::new(EventBus::default());

    // --- Scheduler ---
    let (scheduler, tokio_receiver) = match config.scheduler.backend {
        SchedulerBackend::Postgres => (
            Arc::new(PgTaskQueue::new(pool.clone())) as Arc<dyn GenerationScheduler>,
            None,
        ),
        SchedulerBackend::Tokio => {
            let (scheduler, receiver) = TokioScheduler::new();
            (
                Arc::new(scheduler) as Arc<dyn GenerationScheduler>,
                Some(receiver),
            )
        }
    };

    let collages = Arc::new(CollageService::new(
        Arc::new(PgCollageStore::new(pool.clone())),
        blobs,
        generator,
        scheduler,
        Arc::clone(&event_bus),
    ));

    // --- Generation worker ---
    let worker_cancel = CancellationToken::new();
    let generations = TaskTracker::new();
    let worker_handle = match tokio_receiver {
        Some(receiver) => tokio::spawn(run_scheduled_generations(
            Arc::clone(&collages),
            receiver,
            generations.clone(),
            worker_cancel.clone(),
        )),
        None => {
            let dispatcher =
                TaskDispatcher::new(pool.clone(), Arc::clone(&collages), generations.clone())
                    .with_poll_interval(Duration::from_millis(config.scheduler.poll_interval_ms))
                    .with_batch_size(config.scheduler.batch_size);
            let cancel = worker_cancel.clone();
            tokio::spawn(async move { dispatcher.run(cancel).await })
        }
    };
    tracing::info!("Generation worker started");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        collages,
        events: event_bus,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop claiming new work, then let started generations write their
    // terminal state before the runtime goes away.
    worker_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let drained = tokio::time::timeout(grace, async {
        if let Err(e) = worker_handle.await {
            tracing::error!(error = %e, "Generation worker panicked");
        }
        generations.close();
        generations.wait().await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            in_flight = generations.len(),
            "Generation tasks did not finish before the shutdown deadline",
        );
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,moodboard_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
