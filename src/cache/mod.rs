//! Cache Module
//!
//! TTL-aware cache stores behind one trait, and a namespacing facade with
//! load-or-update memoization on top.

mod clock;
mod entry;
mod file;
mod memory;
mod namespace;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{expiry_from_ttl, CacheEntry};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use namespace::{Memoized, Namespaced, Origin};
pub use stats::CacheStats;
pub use store::{Backend, Cache, Lookup};
