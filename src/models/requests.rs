//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Maximum length of a namespace or key path segment, in bytes
pub const MAX_SEGMENT_LENGTH: usize = 256;

/// Request body for `PUT /cache/:namespace/:key`
///
/// # Fields
/// - `value`: Any JSON document
/// - `ttl`: Optional TTL in seconds; omitted means the entry never expires
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRequest {
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Request body for `POST /cache/:namespace/:key/touch`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TouchRequest {
    /// New TTL in seconds; zero or less expires the entry now
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Query string for `GET /cache/:namespace/:key`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadQuery {
    #[serde(default)]
    pub ignore_expiration: bool,
}

/// Validates a namespace or key path segment.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_segment(label: &str, segment: &str) -> Option<String> {
    if segment.is_empty() {
        return Some(format!("{label} cannot be empty"));
    }
    if segment.len() > MAX_SEGMENT_LENGTH {
        return Some(format!(
            "{label} exceeds maximum length of {MAX_SEGMENT_LENGTH} bytes"
        ));
    }
    None
}
