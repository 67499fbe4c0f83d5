// ============================================================================
// Database Configuration
// ============================================================================

use std::fmt;

use crate::constants::*;
use crate::env::Vars;

/// Connection parameters and pool tuning for the RADIUS database
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database name
    pub name: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
    /// Timeout for idle connections before they are closed (seconds)
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    pub(crate) fn from_vars(vars: &Vars<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            host: vars.string("DB_HOST", DEFAULT_DB_HOST),
            port: vars.parsed("DB_PORT", DEFAULT_DB_PORT)?,
            username: vars.string("DB_USERNAME", DEFAULT_DB_USERNAME),
            password: vars.string("DB_PASSWORD", DEFAULT_DB_PASSWORD),
            name: vars.string("DB_NAME", DEFAULT_DB_NAME),
            max_connections: vars.parsed("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            acquire_timeout_secs: vars
                .parsed("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_DB_ACQUIRE_TIMEOUT_SECS)?,
            idle_timeout_secs: vars.parsed("DB_IDLE_TIMEOUT_SECS", DEFAULT_DB_IDLE_TIMEOUT_SECS)?,
        })
    }

    /// `user@host:port/name`, safe to log
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.username, self.host, self.port, self.name)
    }
}

// Keeps the password out of startup logs and panic messages.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .finish()
    }
}
