//! Namespacing Facade Module
//!
//! Prefixes every key with a namespace before delegating to a shared store,
//! and adds the load-or-update memoization helper.
//!
//! # Concurrency
//! `load_or_update` is not atomic. Two callers racing on the same expired key
//! can both see it as expired, both compute, and both save; the last save
//! wins. A positive `ttl_extend` narrows that window: the first caller pushes
//! the stale entry's expiry forward, so callers arriving after it get the
//! stale value instead of computing again. Nothing is locked.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{Cache, Lookup};
use crate::error::{CacheWriteWarning, LoadOrUpdateError, Result, StoreError};

// == Memoized ==
/// Where a value returned by `load_or_update` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cached,
    Computed,
}

/// A value produced by `load_or_update`.
#[derive(Debug)]
pub struct Memoized<T> {
    pub value: T,
    pub origin: Origin,
    /// Set when the value was computed but could not be written back
    pub warning: Option<CacheWriteWarning>,
}

impl<T> Memoized<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn was_cached(&self) -> bool {
        self.origin == Origin::Cached
    }
}

// == Namespaced ==
/// A [`Cache`] view over a shared store with every key prefixed by
/// `namespace`.
///
/// The facade owns no entries and needs no locking of its own. Several
/// facades over one store partition it into independent logical caches, as
/// long as no namespace is a prefix of another namespace's keys.
#[derive(Debug)]
pub struct Namespaced<C: Cache + ?Sized> {
    store: Arc<C>,
    namespace: String,
}

impl<C: Cache + ?Sized> Clone for Namespaced<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
        }
    }
}

impl<C: Cache + ?Sized> Namespaced<C> {
    // == Constructor ==
    pub fn new(store: Arc<C>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Changes the prefix applied to keys from now on.
    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
    }

    /// The wrapped store.
    pub fn store(&self) -> &Arc<C> {
        &self.store
    }

    /// Replaces the wrapped store.
    pub fn set_store(&mut self, store: Arc<C>) {
        self.store = store;
    }

    fn assemble_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    // == Typed Access ==
    /// Serializes `value` and saves it under `key`.
    pub fn save_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<i64>) -> Result<()> {
        let key = self.assemble_key(key);
        let value = encode(&key, value)?;
        self.store.save(&key, value, ttl)
    }

    /// Loads the value under `key` and deserializes it into `T`.
    pub fn load_as<T: DeserializeOwned>(
        &self,
        key: &str,
        ignore_expiration: bool,
    ) -> Result<Option<T>> {
        let key = self.assemble_key(key);
        self.store
            .load(&key, ignore_expiration)?
            .map(|value| decode(&key, value))
            .transpose()
    }

    // == Load Or Update ==
    /// Returns the fresh value under `key`, or computes, saves and returns a
    /// new one.
    ///
    /// `compute` runs only when the entry is expired or missing. If it fails,
    /// its error is returned as [`LoadOrUpdateError::Compute`] and the store is
    /// left as it was. If the save afterwards fails, the computed value is
    /// still returned with the failure attached as [`Memoized::warning`].
    ///
    /// See the module docs for the race this does not prevent.
    pub fn load_or_update<T, E, F>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<i64>,
        ttl_extend: u64,
    ) -> std::result::Result<Memoized<T>, LoadOrUpdateError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let key = self.assemble_key(key);
        if let Lookup::Fresh(value) = self.store.test_load(&key, ttl_extend)? {
            return Ok(cached(&key, value)?);
        }

        debug!(key = %key, "cache miss, computing value");
        let value = compute().map_err(LoadOrUpdateError::Compute)?;
        Ok(self.write_back(key, value, ttl))
    }

    /// Async form of [`Namespaced::load_or_update`] for computations that
    /// await.
    pub async fn load_or_update_async<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<i64>,
        ttl_extend: u64,
    ) -> std::result::Result<Memoized<T>, LoadOrUpdateError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.assemble_key(key);
        if let Lookup::Fresh(value) = self.store.test_load(&key, ttl_extend)? {
            return Ok(cached(&key, value)?);
        }

        debug!(key = %key, "cache miss, computing value");
        let value = compute().await.map_err(LoadOrUpdateError::Compute)?;
        Ok(self.write_back(key, value, ttl))
    }

    fn write_back<T: Serialize>(&self, key: String, value: T, ttl: Option<i64>) -> Memoized<T> {
        let saved = encode(&key, &value).and_then(|encoded| self.store.save(&key, encoded, ttl));

        let warning = saved.err().map(|source| {
            warn!(key = %key, error = %source, "computed value could not be cached");
            CacheWriteWarning { key, source }
        });

        Memoized {
            value,
            origin: Origin::Computed,
            warning,
        }
    }
}

impl<C: Cache + ?Sized> Cache for Namespaced<C> {
    fn save(&self, key: &str, value: Value, ttl: Option<i64>) -> Result<()> {
        self.store.save(&self.assemble_key(key), value, ttl)
    }

    fn load(&self, key: &str, ignore_expiration: bool) -> Result<Option<Value>> {
        self.store.load(&self.assemble_key(key), ignore_expiration)
    }

    fn test_load(&self, key: &str, ttl_extend: u64) -> Result<Lookup> {
        self.store.test_load(&self.assemble_key(key), ttl_extend)
    }

    fn test(&self, key: &str) -> Result<bool> {
        self.store.test(&self.assemble_key(key))
    }

    fn touch(&self, key: &str, ttl: Option<i64>) -> Result<()> {
        self.store.touch(&self.assemble_key(key), ttl)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(&self.assemble_key(key))
    }
}

fn cached<T: DeserializeOwned>(key: &str, value: Value) -> Result<Memoized<T>> {
    Ok(Memoized {
        value: decode(key, value)?,
        origin: Origin::Cached,
        warning: None,
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}
