// ============================================================================
// Caller Extractor
// ============================================================================
//
// Reads the identity published by `auth_context` from request extensions.
//
// Usage:
// ```rust
// async fn handler(Caller(caller): Caller, ...) -> Result<...> {
//     tracing::info!(actor = %caller.username, "...");
// }
// ```
//
// Never rejects: a route where `auth_context` did not run, or a request
// without `Remote-User`, sees `AuthInfo::anonymous()`.
//
// ============================================================================

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::auth::AuthInfo;

#[derive(Debug, Clone)]
pub struct Caller(pub AuthInfo);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let info = parts
            .extensions
            .get::<AuthInfo>()
            .cloned()
            .unwrap_or_else(AuthInfo::anonymous);
        Ok(Caller(info))
    }
}
