// ============================================================================
// Host Router
// ============================================================================
//
// Routes requests to a sub-application by exact Host match:
// - any configured intern host → intern application
// - anything else              → public application (logged)
//
// Both applications are built once. Every intern alias maps to the same
// intern instance, so aliases share state and policy. The table is never
// mutated after construction and needs no locking.
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::header::HOST,
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Which sub-application a host resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenant {
    Intern,
    Public,
}

pub struct HostRouter {
    hosts: HashMap<String, Tenant>,
    intern: Router,
    public: Router,
}

impl HostRouter {
    pub fn new<I, H>(intern_hosts: I, intern: Router, public: Router) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        let hosts = intern_hosts
            .into_iter()
            .map(|h| (h.into(), Tenant::Intern))
            .collect();
        Self {
            hosts,
            intern,
            public,
        }
    }

    /// Exact, case-sensitive lookup. Unknown hosts fall back to public.
    pub fn resolve(&self, host: Option<&str>) -> Tenant {
        match host.and_then(|h| self.hosts.get(h)) {
            Some(tenant) => *tenant,
            None => {
                tracing::warn!(
                    host = host.unwrap_or("-"),
                    "Host not found, falling back to public"
                );
                Tenant::Public
            }
        }
    }

    pub fn router(&self, tenant: Tenant) -> Router {
        match tenant {
            Tenant::Intern => self.intern.clone(),
            Tenant::Public => self.public.clone(),
        }
    }
}

/// Host as declared by the client: the Host header, else the URI authority
fn request_host(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

/// Fallback handler of the server router; forwards to the selected application
pub async fn dispatch(State(hosts): State<Arc<HostRouter>>, request: Request) -> Response {
    let tenant = hosts.resolve(request_host(&request));
    tracing::trace!(tenant = ?tenant, path = %request.uri().path(), "Dispatching request");

    match hosts.router(tenant).oneshot(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    }
}
