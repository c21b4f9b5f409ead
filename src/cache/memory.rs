//! Memory Store Module
//!
//! Reference backend: a HashMap of entries behind a RwLock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{Backend, Cache, CacheEntry, CacheStats, Clock, Lookup, SystemClock};
use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

// == Memory Store ==
/// In-process cache storage with TTL support.
///
/// Expired entries stay in the map until overwritten, deleted or purged, so
/// they can still be read with `ignore_expiration`.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            clock,
        }
    }

    // == Length ==
    /// Returns the number of entries held, expired ones included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read("*")?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self, key: &str) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned {
            key: key.to_string(),
        })
    }

    fn write(&self, key: &str) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned {
            key: key.to_string(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryStore {
    fn save(&self, key: &str, value: Value, ttl: Option<i64>) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        let mut inner = self.write(key)?;
        inner.entries.insert(key.to_string(), entry);
        inner.stats.record_write();
        debug!(key, ?ttl, "memory store: saved entry");
        Ok(())
    }

    fn load(&self, key: &str, ignore_expiration: bool) -> Result<Option<Value>> {
        let now = self.clock.now_ms();
        let mut inner = self.write(key)?;
        let Inner { entries, stats } = &mut *inner;

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                stats.record_hit();
                Ok(Some(entry.value.clone()))
            }
            Some(entry) if ignore_expiration => {
                stats.record_stale_read();
                Ok(Some(entry.value.clone()))
            }
            _ => {
                stats.record_miss();
                Ok(None)
            }
        }
    }

    fn test_load(&self, key: &str, ttl_extend: u64) -> Result<Lookup> {
        let now = self.clock.now_ms();
        let mut inner = self.write(key)?;
        let Inner { entries, stats } = &mut *inner;

        let Some(entry) = entries.get_mut(key) else {
            stats.record_miss();
            return Ok(Lookup::Missing);
        };

        if !entry.is_expired_at(now) {
            stats.record_hit();
            return Ok(Lookup::Fresh(entry.value.clone()));
        }

        if ttl_extend > 0 {
            entry.retouch(now, Some(i64::try_from(ttl_extend).unwrap_or(i64::MAX)));
            debug!(key, ttl_extend, "memory store: extended stale entry");
        }
        stats.record_stale_read();
        Ok(Lookup::Stale(entry.value.clone()))
    }

    fn test(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_ms();
        let inner = self.read(key)?;
        Ok(inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now)))
    }

    fn touch(&self, key: &str, ttl: Option<i64>) -> Result<()> {
        let now = self.clock.now_ms();
        let mut inner = self.write(key)?;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.retouch(now, ttl);
            debug!(key, ?ttl, "memory store: touched entry");
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.write(key)?;
        if inner.entries.remove(key).is_some() {
            inner.stats.record_delete();
            debug!(key, "memory store: deleted entry");
        }
        Ok(())
    }
}

impl Backend for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    // == Purge Expired ==
    fn purge_expired(&self, retention: Duration) -> Result<usize> {
        let now = self.clock.now_ms();
        let retention_ms = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);
        let mut inner = self.write("*")?;

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| {
            entry
                .expired_for_ms(now)
                .map_or(true, |expired_for| expired_for < retention_ms)
        });
        Ok(before - inner.entries.len())
    }

    fn stats(&self) -> Result<CacheStats> {
        let inner = self.read("*")?;
        Ok(inner.stats.with_total_entries(inner.entries.len()))
    }
}
