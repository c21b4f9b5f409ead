//! API Handlers
//!
//! HTTP request handlers. Each request binds a [`Namespaced`] facade over the
//! shared backend for the namespace in its path.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{Backend, Cache, FileStore, MemoryStore, Namespaced};
use crate::config::{BackendKind, Config};
use crate::error::{ApiError, ApiResult, Result};
use crate::models::{
    validate_segment, HealthResponse, LoadQuery, LoadResponse, MessageResponse, SaveRequest,
    StatsResponse, TestResponse, TouchRequest,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared physical store
    pub backend: Arc<dyn Backend>,
    /// Appended to the namespace segment to form the key prefix
    pub separator: String,
}

impl AppState {
    /// Creates a new AppState over the given backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            separator: ":".to_string(),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opening the file backend can fail if its directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::File => Arc::new(FileStore::open(&config.cache_dir)?),
        };
        Ok(Self {
            backend,
            separator: config.namespace_separator.clone(),
        })
    }

    /// Facade for `namespace`, after validating the path segments.
    fn cache(&self, namespace: &str, key: &str) -> ApiResult<Namespaced<dyn Backend>> {
        if let Some(msg) =
            validate_segment("Namespace", namespace).or_else(|| validate_segment("Key", key))
        {
            return Err(ApiError::InvalidRequest(msg));
        }
        Ok(Namespaced::new(
            Arc::clone(&self.backend),
            format!("{}{}", namespace, self.separator),
        ))
    }
}

/// Runs a store call on the blocking pool.
///
/// The file backend does synchronous filesystem I/O, which must not stall the
/// async workers.
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Handler for PUT /cache/:namespace/:key
pub async fn save_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Json(req): Json<SaveRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let cache = state.cache(&namespace, &key)?;
    let key = run_blocking(move || {
        cache.save(&key, req.value, req.ttl)?;
        Ok(key)
    })
    .await?;

    Ok(Json(MessageResponse::new(key, "saved")))
}

/// Handler for GET /cache/:namespace/:key
///
/// `?ignore_expiration=true` returns expired values that are still stored.
pub async fn load_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Query(query): Query<LoadQuery>,
) -> ApiResult<Json<LoadResponse>> {
    let cache = state.cache(&namespace, &key)?;
    let lookup_key = key.clone();
    let value = run_blocking(move || Ok(cache.load(&lookup_key, query.ignore_expiration)?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{namespace}/{key}")))?;

    Ok(Json(LoadResponse::new(namespace, key, value)))
}

/// Handler for GET /cache/:namespace/:key/test
pub async fn test_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> ApiResult<Json<TestResponse>> {
    let cache = state.cache(&namespace, &key)?;
    let lookup_key = key.clone();
    let fresh = run_blocking(move || Ok(cache.test(&lookup_key)?)).await?;

    Ok(Json(TestResponse::new(key, fresh)))
}

/// Handler for POST /cache/:namespace/:key/touch
pub async fn touch_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Json(req): Json<TouchRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let cache = state.cache(&namespace, &key)?;
    let key = run_blocking(move || {
        cache.touch(&key, req.ttl)?;
        Ok(key)
    })
    .await?;

    Ok(Json(MessageResponse::new(key, "touched")))
}

/// Handler for DELETE /cache/:namespace/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let cache = state.cache(&namespace, &key)?;
    let key = run_blocking(move || {
        cache.delete(&key)?;
        Ok(key)
    })
    .await?;

    Ok(Json(MessageResponse::new(key, "deleted")))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let backend = Arc::clone(&state.backend);
    let stats = run_blocking(move || Ok(backend.stats()?)).await?;
    Ok(Json(StatsResponse::new(state.backend.name(), stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
