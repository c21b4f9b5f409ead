//! Purge Task
//!
//! Background task that periodically removes entries which have been expired
//! for longer than a retention window. Entries inside the window stay
//! readable with `ignore_expiration`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Backend;

/// Spawns a background task that purges long-expired entries from `backend`.
///
/// The store call runs on the blocking pool, since file-backed stores touch
/// the filesystem.
///
/// # Arguments
/// * `backend` - shared reference to the store
/// * `interval` - time between purge runs
/// * `retention` - how long an expired entry is kept before removal
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_purge_task(
    backend: Arc<dyn Backend>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            backend = backend.name(),
            "Starting purge task with interval of {:?} and retention of {:?}", interval, retention
        );

        loop {
            tokio::time::sleep(interval).await;

            let store = Arc::clone(&backend);
            let outcome =
                tokio::task::spawn_blocking(move || store.purge_expired(retention)).await;

            match outcome {
                Ok(Ok(0)) => debug!("Purge: no long-expired entries found"),
                Ok(Ok(removed)) => info!("Purge: removed {} long-expired entries", removed),
                Ok(Err(err)) => warn!(error = %err, "Purge run failed"),
                Err(err) => warn!(error = %err, "Purge run panicked"),
            }
        }
    })
}
