//! GoLoop API server
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use goloop::{
    api::{build_router, AppState},
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, EventStore},
    services::{RedisService, ServiceFactory},
    utils::logging,
};

const LIMITER_CLEANUP_PERIOD: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate().context("invalid configuration")?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", goloop::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;
    let store: Arc<dyn EventStore> = Arc::new(DatabaseService::new(pool, settings.database.transaction_retries));

    // Redis backs the leaderboard cache and the change relay
    let redis = match RedisService::new(settings.redis.clone()) {
        Ok(redis) => Some(Arc::new(redis)),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, continuing without cache and relay");
            None
        }
    };

    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, store, redis.clone())?;

    let _relay = match (&redis, settings.features.live_updates) {
        (Some(redis), true) => Some(redis.clone().forward_changes(services.feed.clone())),
        _ => None,
    };
    let _limiter_cleanup = services.limiter.clone().spawn_cleanup(LIMITER_CLEANUP_PERIOD);

    let state = AppState::new(&settings, services);
    let router = build_router(state);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!(address = %address, "GoLoop API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("GoLoop API has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
