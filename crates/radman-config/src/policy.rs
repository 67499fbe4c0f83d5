// ============================================================================
// Authorization Policy Configuration
// ============================================================================

use crate::constants::{DEFAULT_POLICY_MODEL_PATH, DEFAULT_POLICY_PATH};
use crate::env::Vars;

/// Locations of the authorization model and policy loaded at startup
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    pub model_path: String,
    pub policy_path: String,
}

impl PolicyConfig {
    pub(crate) fn from_vars(vars: &Vars<'_>) -> Self {
        Self {
            model_path: vars.string("POLICY_MODEL_PATH", DEFAULT_POLICY_MODEL_PATH),
            policy_path: vars.string("POLICY_PATH", DEFAULT_POLICY_PATH),
        }
    }
}
