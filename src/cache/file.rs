//! File Store Module
//!
//! Backend that keeps one JSON document per key in a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{Backend, Cache, CacheEntry, CacheStats, Clock, Lookup, SystemClock};
use crate::error::{Result, StoreError};

const RECORD_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";

/// On-disk record. The original key is kept so the file is self-describing.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

// == File Store ==
/// File-backed cache storage.
///
/// Each key maps to `<dir>/<hex sha256 of key>.json`. Writes go to a unique
/// temporary file first and are renamed into place, so readers never observe
/// a half-written record.
///
/// Every mutation (save, delete, touch, the extend path of `test_load` and
/// purge) runs under `write_lock`. Plain reads skip it.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    stats: Mutex<CacheStats>,
    write_lock: Mutex<()>,
    tmp_counter: AtomicU64,
}

impl FileStore {
    // == Constructor ==
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_clock(dir, Arc::new(SystemClock))
    }

    pub fn open_with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;

        Ok(Self {
            dir,
            clock,
            stats: Mutex::new(CacheStats::new()),
            write_lock: Mutex::new(()),
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.{}", hex::encode(digest), RECORD_EXTENSION))
    }

    fn read_record(&self, key: &str, path: &Path) -> Result<Option<CacheEntry>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let record: StoredEntry =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })?;

        // Same digest, different key: treat as absent rather than hand out
        // another key's value.
        if record.key != key {
            warn!(key, stored = %record.key, "file store: digest collision");
            return Ok(None);
        }
        Ok(Some(record.entry))
    }

    fn write_record(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let path = self.record_path(key);
        let record = StoredEntry {
            key: key.to_string(),
            entry,
        };
        let bytes = serde_json::to_vec(&record).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));

        let io_err = |source: std::io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, bytes).map_err(io_err)?;
        if let Err(source) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(source));
        }
        Ok(())
    }

    fn lock_writes(&self, key: &str) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| StoreError::Poisoned {
            key: key.to_string(),
        })
    }

    fn with_stats(&self, key: &str, f: impl FnOnce(&mut CacheStats)) -> Result<()> {
        let mut stats = self.stats.lock().map_err(|_| StoreError::Poisoned {
            key: key.to_string(),
        })?;
        f(&mut stats);
        Ok(())
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        self.paths_with_extension(RECORD_EXTENSION)
    }

    fn paths_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let dir_err = |source: std::io::Error| StoreError::Io {
            key: self.dir.display().to_string(),
            source,
        };

        let mut paths = Vec::new();
        for dirent in fs::read_dir(&self.dir).map_err(dir_err)? {
            let path = dirent.map_err(dir_err)?.path();
            if path.extension().is_some_and(|ext| ext == extension) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Removes temporary files whose mtime is at least `older_than` ago.
    /// Callers hold `write_lock`, so no write from this store is in flight.
    fn sweep_tmp_files(&self, older_than: Duration) -> Result<usize> {
        let mut swept = 0;
        for path in self.paths_with_extension(TMP_EXTENSION)? {
            let age = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .map(|modified| modified.elapsed().unwrap_or_default());
            match age {
                Ok(age) if age >= older_than => {}
                Ok(_) => continue,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "file store: cannot stat temp file");
                    continue;
                }
            }

            match fs::remove_file(&path) {
                Ok(()) => swept += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        key: path.display().to_string(),
                        source,
                    })
                }
            }
        }
        if swept > 0 {
            debug!(swept, "file store: removed orphaned temp files");
        }
        Ok(swept)
    }
}

impl Cache for FileStore {
    fn save(&self, key: &str, value: Value, ttl: Option<i64>) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        let _guard = self.lock_writes(key)?;
        self.write_record(key, entry)?;
        self.with_stats(key, CacheStats::record_write)?;
        debug!(key, ?ttl, "file store: saved entry");
        Ok(())
    }

    fn load(&self, key: &str, ignore_expiration: bool) -> Result<Option<Value>> {
        let now = self.clock.now_ms();
        let path = self.record_path(key);

        match self.read_record(key, &path)? {
            Some(entry) if !entry.is_expired_at(now) => {
                self.with_stats(key, CacheStats::record_hit)?;
                Ok(Some(entry.value))
            }
            Some(entry) if ignore_expiration => {
                self.with_stats(key, CacheStats::record_stale_read)?;
                Ok(Some(entry.value))
            }
            _ => {
                self.with_stats(key, CacheStats::record_miss)?;
                Ok(None)
            }
        }
    }

    fn test_load(&self, key: &str, ttl_extend: u64) -> Result<Lookup> {
        // The extend path writes back what it read.
        let _guard = if ttl_extend > 0 {
            Some(self.lock_writes(key)?)
        } else {
            None
        };
        let now = self.clock.now_ms();
        let path = self.record_path(key);

        let Some(mut entry) = self.read_record(key, &path)? else {
            self.with_stats(key, CacheStats::record_miss)?;
            return Ok(Lookup::Missing);
        };

        if !entry.is_expired_at(now) {
            self.with_stats(key, CacheStats::record_hit)?;
            return Ok(Lookup::Fresh(entry.value));
        }

        if ttl_extend > 0 {
            entry.retouch(now, Some(i64::try_from(ttl_extend).unwrap_or(i64::MAX)));
            let value = entry.value.clone();
            self.write_record(key, entry)?;
            debug!(key, ttl_extend, "file store: extended stale entry");
            self.with_stats(key, CacheStats::record_stale_read)?;
            return Ok(Lookup::Stale(value));
        }

        self.with_stats(key, CacheStats::record_stale_read)?;
        Ok(Lookup::Stale(entry.value))
    }

    fn test(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_ms();
        let entry = self.read_record(key, &self.record_path(key))?;
        Ok(entry.is_some_and(|entry| !entry.is_expired_at(now)))
    }

    fn touch(&self, key: &str, ttl: Option<i64>) -> Result<()> {
        let _guard = self.lock_writes(key)?;
        let now = self.clock.now_ms();
        if let Some(mut entry) = self.read_record(key, &self.record_path(key))? {
            entry.retouch(now, ttl);
            self.write_record(key, entry)?;
            debug!(key, ?ttl, "file store: touched entry");
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock_writes(key)?;
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => {
                self.with_stats(key, CacheStats::record_delete)?;
                debug!(key, "file store: deleted entry");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl Backend for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    // == Purge Expired ==
    /// Unreadable or corrupt records are logged and skipped.
    ///
    /// Temporary files older than `retention` are left over from writes that
    /// never reached the rename, and are swept as well. They are not counted.
    fn purge_expired(&self, retention: Duration) -> Result<usize> {
        let _guard = self.lock_writes("*")?;
        self.sweep_tmp_files(retention)?;

        let now = self.clock.now_ms();
        let retention_ms = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);
        let mut removed = 0;

        for path in self.record_paths()? {
            let record: StoredEntry = match fs::read(&path)
                .map_err(|err| err.to_string())
                .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|err| err.to_string()))
            {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "file store: skipping unreadable record");
                    continue;
                }
            };

            let expired_long_enough = record
                .entry
                .expired_for_ms(now)
                .is_some_and(|expired_for| expired_for >= retention_ms);
            if !expired_long_enough {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        key: record.key,
                        source,
                    })
                }
            }
        }
        Ok(removed)
    }

    fn stats(&self) -> Result<CacheStats> {
        let total = self.record_paths()?.len();
        let stats = self.stats.lock().map_err(|_| StoreError::Poisoned {
            key: "*".to_string(),
        })?;
        Ok(stats.with_total_entries(total))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use tempfile::TempDir;

    const START: u64 = 1_700_000_000_000;

    fn store_with_clock() -> (FileStore, Arc<ManualClock>, TempDir) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let store = FileStore::open_with_clock(dir.path().join("cache"), clock.clone()).unwrap();
        (store, clock, dir)
    }

    #[test]
    fn test_open_creates_directory() {
        let (store, _, _dir) = store_with_clock();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_save_and_load() {
        let (store, _, _dir) = store_with_clock();
        let value = json!({"name": "widget", "tags": ["a", "b"], "price": 9.5});

        store.save("product/1", value.clone(), Some(60)).unwrap();

        assert_eq!(store.load("product/1", false).unwrap(), Some(value));
        assert!(store.test("product/1").unwrap());
    }

    #[test]
    fn test_keys_with_path_characters_are_safe() {
        let (store, _, _dir) = store_with_clock();

        store.save("../../etc/passwd", json!(1), None).unwrap();
        store.save("a/b\\c:d", json!(2), None).unwrap();

        assert_eq!(store.load("../../etc/passwd", false).unwrap(), Some(json!(1)));
        assert_eq!(store.load("a/b\\c:d", false).unwrap(), Some(json!(2)));
        assert_eq!(store.record_paths().unwrap().len(), 2);
    }

    #[test]
    fn test_expiry_and_ignore_expiration() {
        let (store, clock, _dir) = store_with_clock();

        store.save("k", json!("v"), Some(2)).unwrap();
        clock.advance_secs(2);

        assert!(!store.test("k").unwrap());
        assert_eq!(store.load("k", false).unwrap(), None);
        assert_eq!(store.load("k", true).unwrap(), Some(json!("v")));
    }

    #[test]
    fn test_test_load_extends_stale_record_on_disk() {
        let (store, clock, _dir) = store_with_clock();

        store.save("k", json!("v"), Some(1)).unwrap();
        clock.advance_secs(5);

        assert_eq!(store.test_load("k", 10).unwrap(), Lookup::Stale(json!("v")));
        assert_eq!(store.test_load("k", 10).unwrap(), Lookup::Fresh(json!("v")));
    }

    #[test]
    fn test_touch_and_delete() {
        let (store, _, _dir) = store_with_clock();

        store.save("k", json!("v"), None).unwrap();
        store.touch("k", Some(-1)).unwrap();
        assert!(!store.test("k").unwrap());
        assert_eq!(store.load("k", true).unwrap(), Some(json!("v")));

        store.touch("missing", Some(10)).unwrap();
        assert_eq!(store.load("missing", true).unwrap(), None);

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.load("k", true).unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_is_a_store_error() {
        let (store, _, _dir) = store_with_clock();

        fs::write(store.record_path("bad"), b"{not json").unwrap();

        let err = store.load("bad", false).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == "bad"));
    }

    #[test]
    fn test_unwritable_directory_is_a_store_error() {
        let (store, _, _dir) = store_with_clock();

        fs::remove_dir_all(store.dir()).unwrap();

        let err = store.save("k", json!(1), None).unwrap_err();
        assert!(matches!(err, StoreError::Io { ref key, .. } if key == "k"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START));

        {
            let store = FileStore::open_with_clock(dir.path(), clock.clone()).unwrap();
            store.save("k", json!([1, 2, 3]), None).unwrap();
        }

        let store = FileStore::open_with_clock(dir.path(), clock).unwrap();
        assert_eq!(store.load("k", false).unwrap(), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_purge_and_stats() {
        let (store, clock, _dir) = store_with_clock();

        store.save("old", json!(1), Some(1)).unwrap();
        store.save("live", json!(2), Some(1_000)).unwrap();
        fs::write(store.dir().join("junk.json"), b"garbage").unwrap();
        clock.advance_secs(100);

        assert_eq!(store.purge_expired(Duration::from_secs(60)).unwrap(), 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.writes, 2);
        // "live" plus the unreadable junk file
        assert_eq!(stats.total_entries, 2);
    }

    #[test]
    fn test_purge_sweeps_orphaned_temp_files() {
        let (store, _, _dir) = store_with_clock();
        store.save("k", json!(1), None).unwrap();
        let orphan = store.record_path("k").with_extension("999.0.tmp");
        fs::write(&orphan, b"{\"half\":").unwrap();

        // Too young for an hour of retention
        store.purge_expired(Duration::from_secs(3_600)).unwrap();
        assert!(orphan.exists());

        assert_eq!(store.purge_expired(Duration::ZERO).unwrap(), 0);
        assert!(!orphan.exists());
        assert_eq!(store.load("k", false).unwrap(), Some(json!(1)));
    }

    // touch re-writes the record it read. A save landing in between must not
    // be reverted to the older value.
    #[test]
    fn test_concurrent_touch_never_reverts_save() {
        for _ in 0..20 {
            let (store, _, _dir) = store_with_clock();
            let store = Arc::new(store);
            store.save("k", json!(0), None).unwrap();
            let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

            let toucher = {
                let store = store.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        store.touch("k", None).unwrap();
                    }
                })
            };

            for i in 1..=200 {
                store.save("k", json!(i), None).unwrap();
            }
            done.store(true, Ordering::SeqCst);
            toucher.join().unwrap();

            assert_eq!(store.load("k", false).unwrap(), Some(json!(200)));
        }
    }

    #[test]
    fn test_concurrent_touch_never_resurrects_delete() {
        for _ in 0..20 {
            let (store, _, _dir) = store_with_clock();
            let store = Arc::new(store);
            store.save("k", json!("v"), Some(1)).unwrap();

            let toucher = {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.touch("k", Some(60)).unwrap();
                        store.test_load("k", 60).unwrap();
                    }
                })
            };
            store.delete("k").unwrap();
            toucher.join().unwrap();

            assert_eq!(store.load("k", true).unwrap(), None);
            assert_eq!(store.test_load("k", 60).unwrap(), Lookup::Missing);
        }
    }
}
