//! Cache Statistics Module
//!
//! Tracks per-backend read and write counters.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that found a fresh entry
    pub hits: u64,
    /// Reads that found nothing usable (absent, or expired without ignore)
    pub misses: u64,
    /// Reads that handed out an expired value
    pub stale_reads: u64,
    /// Number of saves
    pub writes: u64,
    /// Number of deletes that removed an entry
    pub deletes: u64,
    /// Current number of entries in the store, expired ones included
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses + stale_reads), or 0.0 if no reads have
    /// been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale_reads;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_stale_read(&mut self) {
        self.stale_reads += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    /// Returns a copy with `total_entries` filled in.
    pub fn with_total_entries(&self, count: usize) -> Self {
        Self {
            total_entries: count,
            ..self.clone()
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.stale_reads, 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_stale_read();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_writes_do_not_affect_hit_rate() {
        let mut stats = CacheStats::new();
        stats.record_write();
        stats.record_delete();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.deletes, 1);
    }

    #[test]
    fn test_with_total_entries() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        let snapshot = stats.with_total_entries(42);
        assert_eq!(snapshot.total_entries, 42);
        assert_eq!(snapshot.hits, 1);
    }
}
