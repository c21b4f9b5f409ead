//! API Module
//!
//! HTTP handlers and routing that expose namespaced caches over REST.
//!
//! # Endpoints
//! - `PUT /cache/:namespace/:key` - Save a value
//! - `GET /cache/:namespace/:key` - Load a value
//! - `GET /cache/:namespace/:key/test` - Check freshness
//! - `POST /cache/:namespace/:key/touch` - Reset the TTL
//! - `DELETE /cache/:namespace/:key` - Delete a key
//! - `GET /stats` - Get backend statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
