// ============================================================================
// Radman Config - Centralized configuration management
// ============================================================================
//
// All settings come from environment variables (a `.env` file is honoured)
// and every one of them has a default, so a bare `radman-server` starts
// against a local Postgres with a single intern host.
//
// ============================================================================

mod constants;
mod database;
mod env;
mod policy;

pub use constants::{
    DEFAULT_BIND_ADDR, DEFAULT_BIND_PORT, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PASSWORD,
    DEFAULT_DB_PORT, DEFAULT_DB_USERNAME, DEFAULT_INTERN_HOST, DEFAULT_POLICY_MODEL_PATH,
    DEFAULT_POLICY_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use database::DbConfig;
pub use policy::PolicyConfig;

use anyhow::Result;
use constants::*;
use env::Vars;

/// Deployment environment, selected with `APP_ENV`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    /// Enables the simulated caller identity when no proxy headers are present
    Development,
}

impl Environment {
    fn parse(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                Environment::Development
            }
            _ => Environment::Production,
        }
    }
}

/// Main configuration structure for the radman server
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,

    /// Host names served by the intern application. Every other host gets
    /// the public application.
    pub intern_hosts: Vec<String>,

    pub request_timeout_secs: u64,
    pub rust_log: String,
    pub environment: Environment,

    // Sub-configurations
    pub db: DbConfig,
    pub policy: PolicyConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars::new(lookup);

        let intern_hosts =
            parse_intern_hosts(&vars.string("INTERN_HOST", DEFAULT_INTERN_HOST));
        if intern_hosts.is_empty() {
            anyhow::bail!("INTERN_HOST must name at least one host");
        }

        Ok(Self {
            bind_address: vars.string("BIND_ADDR", DEFAULT_BIND_ADDR),
            port: vars.parsed("BIND_PORT", DEFAULT_BIND_PORT)?,
            intern_hosts,
            request_timeout_secs: vars
                .parsed("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            rust_log: vars.string("RUST_LOG", "info"),
            environment: Environment::parse(vars.get("APP_ENV")),
            db: DbConfig::from_vars(&vars)?,
            policy: PolicyConfig::from_vars(&vars),
        })
    }

    /// `address:port` to bind the listener to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// Splits a comma-separated host list, trimming entries and dropping empties.
/// Order is preserved and duplicates are removed.
pub fn parse_intern_hosts(raw: &str) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for host in raw.split(',').map(str::trim).filter(|h| !h.is_empty()) {
        if !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
    }
    hosts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(&move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.listen_address(), "0.0.0.0:3000");
        assert_eq!(config.intern_hosts, vec![DEFAULT_INTERN_HOST.to_string()]);
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 5432);
        assert_eq!(config.db.username, "postgres");
        assert_eq!(config.db.name, "radius");
        assert_eq!(config.policy.model_path, "model.conf");
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_intern_host_aliases() {
        let config = load(&[("INTERN_HOST", " intern.a.test , ,intern.b.test,intern.a.test")])
            .unwrap();
        assert_eq!(config.intern_hosts, vec!["intern.a.test", "intern.b.test"]);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("DB_HOST", ""), ("BIND_PORT", "  ")]).unwrap();
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = load(&[("DB_PORT", "fivefourthreetwo")]).unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_intern_host_list_cannot_be_only_separators() {
        assert!(load(&[("INTERN_HOST", ", ,")]).is_err());
    }

    #[test]
    fn test_development_environment() {
        let config = load(&[("APP_ENV", "development")]).unwrap();
        assert!(config.is_development());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = load(&[("DB_PASSWORD", "hunter2")]).unwrap();
        let rendered = format!("{:?}", config.db);
        assert!(!rendered.contains("hunter2"));
        assert_eq!(config.db.describe(), "postgres@localhost:5432/radius");
    }
}
