// ============================================================================
// Configuration Constants
// ============================================================================

// Listener defaults
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_BIND_PORT: u16 = 3000;
pub const DEFAULT_INTERN_HOST: &str = "intern.corp.example.com";

// Database defaults
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_USERNAME: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "postgres";
pub const DEFAULT_DB_NAME: &str = "radius";

// Pool tuning
pub(crate) const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub(crate) const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;

// Per-request deadline, inherited by every database call made while serving it
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Authorization policy files
pub const DEFAULT_POLICY_MODEL_PATH: &str = "model.conf";
pub const DEFAULT_POLICY_PATH: &str = "policy.csv";
