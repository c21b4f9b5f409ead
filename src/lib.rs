//! nscache - a namespaced, TTL-aware cache
//!
//! Cache stores behind one trait, a namespacing facade with load-or-update
//! memoization, and a small HTTP server exposing both.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Backend, Cache, FileStore, Lookup, Memoized, MemoryStore, Namespaced, Origin};
pub use config::Config;
pub use error::{CacheWriteWarning, LoadOrUpdateError, StoreError};
pub use tasks::spawn_purge_task;
