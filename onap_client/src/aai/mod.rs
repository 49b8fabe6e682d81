//! Wrappers for the A&AI (Active and Available Inventory) REST API
//!
//! Every A&AI resource lives under a versioned prefix, e.g., `/aai/v27/network/pnfs`. The
//! helpers here build those paths so that wrappers do not hard code the version.
pub mod bulk;

/// The A&AI REST API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "v27";

/// Build the path of an A&AI `resource` for the given API `version`
///
/// Leading slashes on `resource` are ignored, so both `"bulk"` and `"/bulk"` produce
/// `/aai/<version>/bulk`.
pub fn api_path(version: &str, resource: &str) -> String {
    format!("/aai/{version}/{}", resource.trim_start_matches('/'))
}
