use radman_config::Config;
use std::sync::Arc;

use crate::policy::RoutePolicy;
use crate::store::DeviceStore;

/// Application context containing shared dependencies.
/// Built once at startup; every field is read-only afterwards.
#[derive(Clone)]
pub struct AppContext {
    pub store: DeviceStore,
    pub policy: Arc<dyn RoutePolicy>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(store: DeviceStore, policy: Arc<dyn RoutePolicy>, config: Arc<Config>) -> Self {
        Self {
            store,
            policy,
            config,
        }
    }
}
