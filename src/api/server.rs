use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{apply_changes, health, trigger_cleanup, trigger_recovery, wal_stats},
    state::AppState,
};
use crate::applier::ChangeApplier;
use crate::config::Config;
use crate::index::{DownstreamIndexes, GraphIndexClient, IndexBackend, VectorIndexClient};
use crate::jobs::JobScheduler;
use crate::observability::Metrics;
use crate::wal::WalStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the application router. Separate from [`run`] so tests can drive
/// the full HTTP surface without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/internal/v1/changes/apply", post(apply_changes))
        .route("/admin/wal/stats", get(wal_stats))
        .route("/admin/jobs/recovery", post(trigger_recovery))
        .route("/admin/jobs/cleanup", post(trigger_cleanup))
        .route("/health", get(health))
        .with_state(state)
        // Automatically decompress gzip/deflate/brotli request bodies
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(address: SocketAddr) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Arc::new(Config::load().map_err(|e| format!("Failed to load config: {}", e))?);

    info!(path = %config.server.data_dir.display(), "Opening WAL store");
    let store = Arc::new(
        WalStore::open(&config.server.data_dir)
            .map_err(|e| format!("Failed to open WAL store: {}", e))?,
    );

    let metrics = Arc::new(Metrics::new());

    let vector = VectorIndexClient::new(&config.indexes.vector)
        .map_err(|e| format!("Failed to build vector index client: {}", e))?;
    let graph = GraphIndexClient::new(&config.indexes.graph)
        .map_err(|e| format!("Failed to build graph index client: {}", e))?;
    let indexes = Arc::new(DownstreamIndexes::new(vec![
        Arc::new(vector) as Arc<dyn IndexBackend>,
        Arc::new(graph) as Arc<dyn IndexBackend>,
    ]));

    let applier = Arc::new(ChangeApplier::new(
        store.clone(),
        indexes.clone(),
        metrics.clone(),
    ));

    let retention = chrono::Duration::days(i64::from(config.wal.retention_days));
    let scheduler = Arc::new(JobScheduler::new(
        store.clone(),
        indexes,
        metrics.clone(),
        retention,
    ));
    scheduler.start(
        Duration::from_secs(config.wal.recovery_interval_secs),
        Duration::from_secs(config.wal.cleanup_interval_secs),
    );

    let state = AppState::new(config, store, applier, scheduler.clone(), metrics);

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "indexwal API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
