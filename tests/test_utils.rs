#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use radman_config::Config;
use radman_server::{
    build_app,
    context::AppContext,
    policy::RoutePolicy,
    store::{DeviceStore, MemoryDeviceBackend},
};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

pub const INTERN_HOST: &str = "intern.corp.test";
pub const INTERN_ALIAS: &str = "devices.corp.test";
pub const PUBLIC_HOST: &str = "www.example.test";

pub struct TestApp {
    pub router: Router,
    pub backend: MemoryDeviceBackend,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Caller as injected by the forward-auth proxy
pub struct Identity {
    pub user: &'static str,
    pub groups: &'static str,
}

pub const ADMIN: Identity = Identity {
    user: "alice",
    groups: "users, sudoers",
};

pub const STAFF: Identity = Identity {
    user: "bob",
    groups: "users",
};

pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "INTERN_HOST".to_string(),
        format!("{}, {}", INTERN_HOST, INTERN_ALIAS),
    );
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(&move |key| vars.get(key).cloned()).expect("Failed to build test config")
}

pub fn spawn_app_with(policy: Arc<dyn RoutePolicy>, config: Config) -> TestApp {
    let backend = MemoryDeviceBackend::new();
    let store = DeviceStore::new(Arc::new(backend.clone()));
    let app_context = Arc::new(AppContext::new(store, policy, Arc::new(config)));

    TestApp {
        router: build_app(app_context),
        backend,
    }
}

pub fn spawn_app(policy: Arc<dyn RoutePolicy>) -> TestApp {
    spawn_app_with(policy, test_config(&[]))
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, host: &str, path: &str, identity: Option<&Identity>) -> TestResponse {
        let builder = with_identity(Request::get(path).header(header::HOST, host), identity);
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        host: &str,
        path: &str,
        form: &str,
        identity: Option<&Identity>,
    ) -> TestResponse {
        let builder = with_identity(
            Request::post(path)
                .header(header::HOST, host)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            identity,
        );
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }
}

fn with_identity(
    builder: axum::http::request::Builder,
    identity: Option<&Identity>,
) -> axum::http::request::Builder {
    match identity {
        Some(id) => builder
            .header("Remote-User", id.user)
            .header("Remote-Name", format!("{} (test)", id.user))
            .header("Remote-Email", format!("{}@corp.test", id.user))
            .header("Remote-Groups", id.groups),
        None => builder,
    }
}
