// ============================================================================
// Route authorization
// ============================================================================
//
// The intern application asks a policy engine whether the caller may invoke
// (method, path). The Casbin engine checks every group the caller belongs to
// and then the username itself; any allow grants access.
//
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, MemoryAdapter, MgmtApi};
use radman_config::PolicyConfig;
use radman_error::AppError;
use tokio::sync::RwLock;

use crate::auth::AuthInfo;

/// Model shipped as `model.conf`; also used for in-memory policies
pub const ROUTE_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && keyMatch(r.obj, p.obj) && (r.act == p.act || p.act == "*")
"#;

#[async_trait]
pub trait RoutePolicy: Send + Sync {
    /// `Ok(false)` denies; `Err` means the engine itself failed
    async fn authorize(&self, caller: &AuthInfo, method: &Method, path: &str)
        -> Result<bool, AppError>;
}

/// Fixed answer regardless of caller
#[derive(Debug, Clone, Copy)]
pub struct StaticPolicy {
    allow: bool,
}

impl StaticPolicy {
    pub fn allow_all() -> Self {
        Self { allow: true }
    }

    pub fn deny_all() -> Self {
        Self { allow: false }
    }
}

#[async_trait]
impl RoutePolicy for StaticPolicy {
    async fn authorize(&self, _: &AuthInfo, _: &Method, _: &str) -> Result<bool, AppError> {
        Ok(self.allow)
    }
}

#[derive(Clone)]
pub struct CasbinPolicy {
    enforcer: Arc<RwLock<Enforcer>>,
}

impl CasbinPolicy {
    /// Load model and policy files; called once at startup
    pub async fn from_config(config: &PolicyConfig) -> Result<Self, AppError> {
        let model = DefaultModel::from_file(&config.model_path)
            .await
            .map_err(|e| {
                AppError::config(format!("Failed to load model {}: {}", config.model_path, e))
            })?;

        let adapter = FileAdapter::new(config.policy_path.clone());
        let enforcer = Enforcer::new(model, adapter).await.map_err(|e| {
            AppError::config(format!("Failed to load policy {}: {}", config.policy_path, e))
        })?;

        tracing::info!(
            model = %config.model_path,
            policy = %config.policy_path,
            "Authorization policy loaded"
        );

        Ok(Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
        })
    }

    /// Build an enforcer over [`ROUTE_MODEL`] with the given `(sub, obj, act)` rules
    pub async fn from_rules(rules: &[(&str, &str, &str)]) -> Result<Self, AppError> {
        let model = DefaultModel::from_str(ROUTE_MODEL)
            .await
            .map_err(|e| AppError::authorization(format!("Failed to load model: {}", e)))?;

        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(|e| AppError::authorization(format!("Failed to create enforcer: {}", e)))?;

        let policies = rules
            .iter()
            .map(|(sub, obj, act)| vec![sub.to_string(), obj.to_string(), act.to_string()])
            .collect::<Vec<_>>();
        enforcer
            .add_policies(policies)
            .await
            .map_err(|e| AppError::authorization(format!("Failed to add policies: {}", e)))?;

        Ok(Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
        })
    }
}

#[async_trait]
impl RoutePolicy for CasbinPolicy {
    async fn authorize(
        &self,
        caller: &AuthInfo,
        method: &Method,
        path: &str,
    ) -> Result<bool, AppError> {
        let enforcer = self.enforcer.read().await;
        let subjects = caller
            .groups
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(caller.username.as_str()));

        for subject in subjects {
            let allowed = enforcer
                .enforce((subject, path, method.as_str()))
                .map_err(|e| AppError::authorization(format!("Enforcement error: {}", e)))?;
            if allowed {
                tracing::trace!(subject = %subject, path = %path, method = %method, "Route allowed");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(username: &str, groups: &[&str]) -> AuthInfo {
        AuthInfo {
            username: username.to_string(),
            name: String::new(),
            email: String::new(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    async fn sample_policy() -> CasbinPolicy {
        CasbinPolicy::from_rules(&[
            ("sudoers", "/*", "*"),
            ("users", "/", "GET"),
            ("users", "/devices", "GET"),
            ("carol", "/devices/edit/*", "GET"),
        ])
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_sudoers_may_mutate() {
        let policy = sample_policy().await;
        let admin = caller("alice", &["users", "sudoers"]);

        assert!(policy.authorize(&admin, &Method::POST, "/devices/add").await.unwrap());
        assert!(policy
            .authorize(&admin, &Method::POST, "/devices/delete/aabbccddeeff")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_users_may_only_list() {
        let policy = sample_policy().await;
        let user = caller("bob", &["users"]);

        assert!(policy.authorize(&user, &Method::GET, "/devices").await.unwrap());
        assert!(!policy.authorize(&user, &Method::POST, "/devices/add").await.unwrap());
        assert!(!policy.authorize(&user, &Method::GET, "/devices/add").await.unwrap());
    }

    #[tokio::test]
    async fn test_username_is_a_subject() {
        let policy = sample_policy().await;
        let carol = caller("carol", &[]);

        assert!(policy
            .authorize(&carol, &Method::GET, "/devices/edit/aabbccddeeff")
            .await
            .unwrap());
        assert!(!policy.authorize(&carol, &Method::GET, "/devices").await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_is_denied() {
        let policy = sample_policy().await;
        assert!(!policy
            .authorize(&AuthInfo::anonymous(), &Method::GET, "/")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_static_policy() {
        let anon = AuthInfo::anonymous();
        assert!(StaticPolicy::allow_all()
            .authorize(&anon, &Method::POST, "/devices/add")
            .await
            .unwrap());
        assert!(!StaticPolicy::deny_all()
            .authorize(&anon, &Method::GET, "/devices")
            .await
            .unwrap());
    }
}
