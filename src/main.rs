// ============================================================================
// Radman Server - entry point
// ============================================================================
//
// Startup order: configuration, tracing, database (fatal if unreachable),
// authorization policy (fatal if unreadable), then the HTTP listener.
//
// ============================================================================

use anyhow::{Context, Result};
use radman_config::Config;
use radman_server::context::AppContext;
use radman_server::policy::CasbinPolicy;
use radman_server::store::{DeviceStore, PgDeviceBackend};
use radman_server::{build_app, shutdown_signal};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    let config = Arc::new(config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Radman Server Starting ===");
    info!("Intern hosts: {}", config.intern_hosts.join(", "));
    info!("Database: {}", config.db.describe());

    if config.is_development() {
        warn!("Development mode: requests without proxy headers get a simulated identity");
    }

    let pool = radman_db::create_pool(&config.db)
        .await
        .context("Database is required to serve requests")?;

    let policy = CasbinPolicy::from_config(&config.policy)
        .await
        .context("Failed to initialise authorization policy")?;

    let store = DeviceStore::new(Arc::new(PgDeviceBackend::new(pool.clone())));
    let app_context = Arc::new(AppContext::new(store, Arc::new(policy), config.clone()));
    let app = build_app(app_context);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    pool.close().await;
    info!("Server stopped");

    Ok(())
}
