//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the TTL arithmetic
//! shared by every backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == TTL Arithmetic ==
/// Computes an absolute expiry from a TTL in seconds.
///
/// - `None` never expires.
/// - A positive TTL expires `ttl` seconds after `now_ms`.
/// - Zero or a negative TTL expires at `now_ms`, i.e. immediately.
pub fn expiry_from_ttl(now_ms: u64, ttl: Option<i64>) -> Option<u64> {
    ttl.map(|secs| match u64::try_from(secs) {
        Ok(secs) if secs > 0 => now_ms.saturating_add(secs.saturating_mul(1000)),
        _ => now_ms,
    })
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now_ms` with optional TTL.
    pub fn new(value: Value, now_ms: u64, ttl: Option<i64>) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at: expiry_from_ttl(now_ms, ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// the expiration time.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Retouch ==
    /// Recomputes the expiry from `now_ms`, leaving the value alone.
    pub fn retouch(&mut self, now_ms: u64, ttl: Option<i64>) {
        self.expires_at = expiry_from_ttl(now_ms, ttl);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at.map(|expires| expires.saturating_sub(now_ms))
    }

    /// How long the entry has been expired, in milliseconds.
    ///
    /// `None` while the entry is still fresh or never expires.
    pub fn expired_for_ms(&self, now_ms: u64) -> Option<u64> {
        match self.expires_at {
            Some(expires) if now_ms >= expires => Some(now_ms - expires),
            _ => None,
        }
    }
}
