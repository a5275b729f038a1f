use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wdd_client::{ArchiveClient, CdxIndex, HtmlFeatureExtractor, ReplayFetcher};
use wdd_core::{
    AppConfig, ProcessorConfig, SnapshotProcessor, TracingWorkerReporter, WorkerConfig,
    WorkerService,
};
use wdd_db::{Database, DatabaseConfig};
use wdd_server::maintenance::run_purge_loop;
use wdd_server::routes;
use wdd_server::state::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wdd=info".parse()?))
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;
    let port = std::env::var("WDD_SERVER_PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let cancel = CancellationToken::new();

    let http = ArchiveClient::new(&config)?;
    let processor = SnapshotProcessor::new(
        CdxIndex::new(http.clone(), &config)?,
        ReplayFetcher::new(http, &config)?,
        HtmlFeatureExtractor::new(),
        db.fingerprint_repo(),
        ProcessorConfig::from(&config),
    );
    let worker = WorkerService::new(db.job_repo(), processor, WorkerConfig::default());
    tracing::info!(slots = config.threads, worker_id = %worker.worker_id(), "Starting worker pool");
    let workers = tokio::spawn(worker.run_pool(
        config.threads,
        cancel.clone(),
        Arc::new(TracingWorkerReporter),
    ));

    let purger = tokio::spawn(run_purge_loop(
        db.fingerprint_repo(),
        db.job_repo(),
        config.job_ttl,
        PURGE_INTERVAL,
        cancel.clone(),
    ));

    let state = Arc::new(AppState { db });
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    workers.await??;
    purger.await?;

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
