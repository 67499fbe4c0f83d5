// ============================================================================
// Gateway Module
// ============================================================================
//
// Host-based dispatch: the Host header selects which sub-application
// handles a request.
//
// ============================================================================

pub mod router;

pub use router::{dispatch, HostRouter, Tenant};
