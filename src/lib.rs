// ============================================================================
// Radman Server
// ============================================================================
//
// Host-routed web application for managing RADIUS device records.
//
// Request path:
//   server router (logging, tracing, deadline, /health)
//     → HostRouter picks intern or public application by Host header
//       → intern: auth_context → authorize → device handlers → DeviceStore
//
// ============================================================================

pub mod audit;
pub mod auth;
pub mod context;
pub mod device;
pub mod gateway;
pub mod policy;
pub mod routes;
pub mod store;
pub mod views;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::context::AppContext;
use crate::gateway::{dispatch, HostRouter};

/// Assemble the server router.
///
/// Sub-applications are built here, once; the returned router is cheap to
/// clone and never changes afterwards.
pub fn build_app(app_context: Arc<AppContext>) -> Router {
    let intern = routes::intern_router(app_context.clone());
    let public = routes::public_router();
    let hosts = Arc::new(HostRouter::new(
        app_context.config.intern_hosts.iter().cloned(),
        intern,
        public,
    ));
    let deadline = Duration::from_secs(app_context.config.request_timeout_secs);

    Router::new()
        .route(
            "/health",
            get(routes::health::health_check).with_state(app_context),
        )
        .fallback(dispatch)
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(routes::middleware::request_logging))
                // Dropping the handler future on timeout rolls back any open unit of work
                .layer(TimeoutLayer::new(deadline))
                .into_inner(),
        )
        .with_state(hosts)
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
