use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use domain::services::IncidentStore;
use persistence::{PgChangeSource, PgIncidentStore};
use sentinel_watch_api::{
    app::create_app,
    config::Config,
    middleware::{init_metrics, logging::init_logging},
    realtime::Realtime,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics()?;

    info!("Starting Sentinel Watch API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let store: Arc<dyn IncidentStore> = Arc::new(PgIncidentStore::new(pool.clone()));
    let offset = config.timeline.offset()?;

    let realtime = if config.realtime.enabled {
        let source = Arc::new(PgChangeSource::new(pool.clone()));
        Some(Realtime::start(source, store.clone(), offset, &config.realtime).await)
    } else {
        info!("Realtime incident updates disabled");
        None
    };

    let addr = config.socket_addr()?;
    let app = create_app(config, store, realtime.as_ref().map(Realtime::state))?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(realtime.as_ref().map(Realtime::state)))
        .await?;

    if let Some(realtime) = realtime {
        realtime.shutdown().await;
    }
    pool.close().await;
    info!("Server stopped");

    Ok(())
}

/// Waits for Ctrl+C, then ends open event streams so connections can drain.
async fn shutdown_signal(realtime: Option<sentinel_watch_api::realtime::RealtimeState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    if let Some(realtime) = realtime {
        realtime.close_streams();
    }
}
