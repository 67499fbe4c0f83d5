// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: intern and public sub-application assembly
// - devices.rs: device management endpoints
// - landing.rs: intern landing page
// - public.rs: public informational pages
// - health.rs: health check (served on every host)
// - extractors.rs: Caller extractor
// - middleware.rs: request logging, caller identity, route authorization
//
// ============================================================================

mod devices;
pub mod extractors;
pub mod health;
mod landing;
pub mod middleware;
mod public;

pub use public::public_router;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::context::AppContext;

/// Intern application: device management behind the forward-auth proxy
pub fn intern_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(landing::landing))
        .route("/devices", get(devices::list_devices))
        .route(
            "/devices/add",
            get(devices::show_add_form).post(devices::add_device),
        )
        .route(
            "/devices/edit/:mac",
            get(devices::show_edit_form).post(devices::update_device),
        )
        .route("/devices/delete/:mac", post(devices::delete_device))
        // Last added runs first: identity is published before authorization
        .layer(axum::middleware::from_fn_with_state(
            app_context.clone(),
            middleware::authorize,
        ))
        .layer(axum::middleware::from_fn_with_state(
            app_context.clone(),
            middleware::auth_context,
        ))
        .with_state(app_context)
}
