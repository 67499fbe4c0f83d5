// ============================================================================
// Axum Middleware
// ============================================================================
//
// - request_logging: log every request on the outer server router
// - auth_context: publish the caller identity (intern application only)
// - authorize: consult the route policy before any intern handler runs
//
// Layer order on the intern router: auth_context runs first, authorize second.
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};
use radman_error::AppError;
use std::sync::Arc;
use std::time::Instant;

use crate::audit::AuditLogger;
use crate::auth::AuthInfo;
use crate::context::AppContext;

/// Request logging middleware
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    tracing::debug!(
        method = %method,
        host = %host,
        path = %path,
        "Incoming request"
    );

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        host = %host,
        path = %path,
        status = %status.as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Publish the caller identity into request extensions.
///
/// Any identity already present is replaced, so nothing upstream of this
/// layer can smuggle one in.
pub async fn auth_context(
    State(ctx): State<Arc<AppContext>>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().remove::<AuthInfo>();

    match AuthInfo::from_headers(req.headers()) {
        Some(info) => {
            tracing::trace!(user = %info.username, groups = ?info.groups, "Caller identified");
            req.extensions_mut().insert(info);
        }
        None if ctx.config.is_development() => {
            let info = AuthInfo::development();
            tracing::debug!(user = %info.username, "No proxy headers, using simulated identity");
            req.extensions_mut().insert(info);
        }
        None => {
            tracing::debug!("No Remote-User header, caller is anonymous");
        }
    }

    next.run(req).await
}

/// Reject the request with 403 unless the route policy allows it
pub async fn authorize(
    State(ctx): State<Arc<AppContext>>,
    req: Request,
    next: Next,
) -> Response {
    let caller = req
        .extensions()
        .get::<AuthInfo>()
        .cloned()
        .unwrap_or_else(AuthInfo::anonymous);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match ctx.policy.authorize(&caller, &method, &path).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(
                user = %caller.username,
                anonymous = caller.is_anonymous(),
                method = %method,
                path = %path,
                "Route denied by policy"
            );
            AuditLogger::log_access_denied(&caller, method.as_str(), &path);
            AppError::forbidden("Forbidden").into_response()
        }
        Err(e) => e.into_response(),
    }
}
