//! Cache Store Module
//!
//! The backend-agnostic contract every store implements, plus the result type
//! of the combined check-and-read.

use std::time::Duration;

use serde_json::Value;

use crate::cache::CacheStats;
use crate::error::Result;

// == Lookup ==
/// Outcome of a combined check-and-read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// An entry exists and has not expired
    Fresh(Value),
    /// An entry exists but has expired
    Stale(Value),
    /// No entry for the key
    Missing,
}

impl Lookup {
    /// True for both "expired" and "absent".
    pub fn is_expired_or_missing(&self) -> bool {
        !matches!(self, Lookup::Fresh(_))
    }

    /// The stored value, whether fresh or stale.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

// == Cache Trait ==
/// Stores, retrieves, expires and deletes `(key, value, expiry)` entries.
///
/// TTLs are in seconds: `None` never expires, a positive TTL expires that
/// many seconds from now, and zero or less expires immediately.
///
/// A store holds at most one entry per key. An absent entry is a normal
/// result (`None`, `false`, [`Lookup::Missing`]); an `Err` always means the
/// backend itself failed.
pub trait Cache: Send + Sync {
    /// Writes or replaces the entry for `key`, expiry included.
    fn save(&self, key: &str, value: Value, ttl: Option<i64>) -> Result<()>;

    /// Reads the value for `key`.
    ///
    /// Expired entries read as `None` unless `ignore_expiration` is set.
    /// Stale values stay readable that way only until the entry is deleted,
    /// overwritten, or removed by [`Backend::purge_expired`] once it has been
    /// expired for the retention window.
    fn load(&self, key: &str, ignore_expiration: bool) -> Result<Option<Value>>;

    /// Checks freshness and reads in one step.
    ///
    /// When the entry has expired and `ttl_extend` is positive, its expiry is
    /// pushed to `ttl_extend` seconds from now. The call itself still reports
    /// [`Lookup::Stale`]; only later readers see the entry as fresh.
    fn test_load(&self, key: &str, ttl_extend: u64) -> Result<Lookup>;

    /// True iff an entry exists and has not expired.
    fn test(&self, key: &str) -> Result<bool>;

    /// Recomputes the expiry of an existing entry without touching its value.
    ///
    /// No-op if the key is absent.
    fn touch(&self, key: &str, ttl: Option<i64>) -> Result<()>;

    /// Removes the entry for `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

// == Backend Trait ==
/// A physical store: a [`Cache`] that also owns its entries.
pub trait Backend: Cache {
    /// Short name for logs and the stats endpoint.
    fn name(&self) -> &'static str;

    /// Removes entries that have been expired for at least `retention`.
    ///
    /// A purged entry is gone for good, so `load(key, true)` stops returning
    /// it.
    ///
    /// Returns the number of entries removed.
    fn purge_expired(&self, retention: Duration) -> Result<usize>;

    fn stats(&self) -> Result<CacheStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_freshness() {
        assert!(!Lookup::Fresh(json!(1)).is_expired_or_missing());
        assert!(Lookup::Stale(json!(1)).is_expired_or_missing());
        assert!(Lookup::Missing.is_expired_or_missing());
    }

    #[test]
    fn test_lookup_value() {
        assert_eq!(Lookup::Fresh(json!("a")).value(), Some(&json!("a")));
        assert_eq!(Lookup::Stale(json!("b")).into_value(), Some(json!("b")));
        assert_eq!(Lookup::Missing.value(), None);
    }
}
