//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error ==
/// Backend-level failure on a store operation.
///
/// Always carries the key that was being accessed. A missing entry is never
/// reported through this type; reads fold absence into `Option`/`Lookup`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing storage failed
    #[error("I/O failure on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded or decoded
    #[error("Serialization failure on key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A thread panicked while holding the store lock
    #[error("Store lock poisoned while accessing key '{key}'")]
    Poisoned { key: String },
}

impl StoreError {
    /// Returns the key the failing operation was working on.
    pub fn key(&self) -> &str {
        match self {
            StoreError::Io { key, .. }
            | StoreError::Serialization { key, .. }
            | StoreError::Poisoned { key } => key,
        }
    }
}

// == Cache Write Warning ==
/// A save that failed after a value was successfully computed.
///
/// Returned alongside the computed value, never instead of it.
#[derive(Error, Debug)]
#[error("Computed value for '{key}' could not be cached: {source}")]
pub struct CacheWriteWarning {
    pub key: String,
    #[source]
    pub source: StoreError,
}

// == Load Or Update Error ==
/// Failure of the composite load-or-update operation.
#[derive(Error, Debug)]
pub enum LoadOrUpdateError<E> {
    /// The store failed before a value could be produced
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller-supplied computation failed
    #[error("Compute callback failed: {0}")]
    Compute(#[source] E),
}

impl<E> LoadOrUpdateError<E> {
    /// Returns the callback error, if that is what failed.
    pub fn into_compute(self) -> Option<E> {
        match self {
            LoadOrUpdateError::Compute(err) => Some(err),
            LoadOrUpdateError::Store(_) => None,
        }
    }
}

// == API Error ==
/// Error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No live entry for the requested key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task running the store call panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Convenience Result type for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_key_accessor() {
        let err = StoreError::Poisoned {
            key: "users:42".to_string(),
        };
        assert_eq!(err.key(), "users:42");
        assert!(err.to_string().contains("users:42"));
    }

    #[test]
    fn test_write_warning_keeps_source() {
        let warning = CacheWriteWarning {
            key: "k".to_string(),
            source: StoreError::Io {
                key: "k".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            },
        };
        let source = std::error::Error::source(&warning).map(|s| s.to_string());
        assert!(source.unwrap().contains("disk full"));
    }

    #[test]
    fn test_into_compute() {
        let err: LoadOrUpdateError<String> = LoadOrUpdateError::Compute("boom".to_string());
        assert_eq!(err.into_compute(), Some("boom".to_string()));

        let err: LoadOrUpdateError<String> = StoreError::Poisoned {
            key: "k".to_string(),
        }
        .into();
        assert!(err.into_compute().is_none());
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::InvalidRequest("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(StoreError::Poisoned {
            key: "x".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_join_error_is_internal() {
        let join_err = tokio::spawn(async { panic!("store call panicked") })
            .await
            .unwrap_err();

        let response = ApiError::from(join_err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
