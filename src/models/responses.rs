//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for `GET /cache/:namespace/:key`
#[derive(Debug, Clone, Serialize)]
pub struct LoadResponse {
    pub namespace: String,
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl LoadResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for `GET /cache/:namespace/:key/test`
#[derive(Debug, Clone, Serialize)]
pub struct TestResponse {
    pub key: String,
    /// Whether a non-expired entry exists
    pub fresh: bool,
}

impl TestResponse {
    pub fn new(key: impl Into<String>, fresh: bool) -> Self {
        Self {
            key: key.into(),
            fresh,
        }
    }
}

/// Response body for save, touch and delete
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
    /// The key that was acted on
    pub key: String,
}

impl MessageResponse {
    /// Creates a response reading "Key '<key>' <action> successfully"
    pub fn new(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {} successfully", key, action),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend name, e.g. "memory"
    pub backend: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / all reads)
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(backend: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            backend: backend.into(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_response_serialize() {
        let resp = LoadResponse::new("users", "42", json!({"name": "ada"}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["namespace"], "users");
        assert_eq!(json["value"]["name"], "ada");
    }

    #[test]
    fn test_message_response() {
        let resp = MessageResponse::new("my_key", "deleted");
        assert_eq!(resp.message, "Key 'my_key' deleted successfully");
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        let resp = StatsResponse::new("memory", stats.with_total_entries(3));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["backend"], "memory");
        assert_eq!(json["hits"], 1);
        assert_eq!(json["total_entries"], 3);
        assert!((resp.hit_rate - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
