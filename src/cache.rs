//! On-disk cache of finished estimations, one JSON file per query.
//!
//! Files are named by a stable hash of the query. Writes go to a temp file
//! in the cache directory and are renamed into place, under a per-key slot
//! lock, so a reader never observes a partial record and two writers for the
//! same query never interleave.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::config;
use crate::error::{GraphiteError, Result};
use crate::models::{CachePayload, CacheRecord};

/// Read/write contract the estimator relies on.
pub trait CacheStore: Send + Sync {
    fn read(&self, query: &str) -> Result<Option<CacheRecord>>;
    /// Store `payload` for `query`, returning where it was written.
    fn write(&self, query: &str, payload: &CachePayload) -> Result<PathBuf>;
}

/// Stable cache key: the first 16 hex characters of SHA-256(query).
pub fn cache_key(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Exclusive hold on one cache key; released on drop.
pub struct CacheSlot<'a> {
    _guard: MutexGuard<'a, ()>,
    key: String,
}

impl CacheSlot<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// File-backed [`CacheStore`].
pub struct CacheManager {
    /// Directory where cached records are stored.
    pub cache_dir: PathBuf,
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheManager {
    /// Create a cache manager rooted at `cache_dir`.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn path_for_query(&self, query: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", cache_key(query)))
    }

    fn slot_lock(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| GraphiteError::InvalidArgument("cache slot table poisoned".into()))?;
        Ok(slots.entry(key.to_string()).or_default().clone())
    }

    /// Drop the table entry for `key` once nobody holds or awaits it.
    fn release_slot(&self, key: &str) {
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        if slots.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            slots.remove(key);
        }
    }

    /// Run `f` while holding the slot for `query`'s key.
    pub fn with_slot<T>(&self, query: &str, f: impl FnOnce(&CacheSlot<'_>) -> Result<T>) -> Result<T> {
        let key = cache_key(query);
        let lock = self.slot_lock(&key)?;
        let result = {
            let guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let slot = CacheSlot {
                _guard: guard,
                key: key.clone(),
            };
            f(&slot)
        };
        drop(lock);
        self.release_slot(&key);
        result
    }

    /// Number of keys currently held or awaited by a writer.
    pub fn active_slots(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    fn write_atomic(&self, dest: &Path, record: &CacheRecord) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, record)?;
            writer.flush()?;
        }
        // A failed persist drops the temp file, which deletes it.
        tmp.persist(dest).map_err(|e| GraphiteError::Io(e.error))?;
        Ok(())
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

impl CacheStore for CacheManager {
    /// Load the record for `query`, if any.
    ///
    /// A corrupt file is deleted so the next live success replaces it.
    fn read(&self, query: &str) -> Result<Option<CacheRecord>> {
        let path = self.path_for_query(query);
        if !path.exists() {
            debug!("cache miss for {:?}", query);
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<CacheRecord>(&contents) {
            Ok(record) => {
                debug!("cache hit for {:?} ({})", query, path.display());
                Ok(Some(record))
            }
            Err(e) => {
                warn!("corrupt cache file {}: {} -- removing", path.display(), e);
                let _ = fs::remove_file(&path);
                Err(GraphiteError::NotFound(format!(
                    "cache file '{}' was corrupt and has been removed: {}",
                    path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown"),
                    e
                )))
            }
        }
    }

    fn write(&self, query: &str, payload: &CachePayload) -> Result<PathBuf> {
        let path = self.path_for_query(query);
        let record = CacheRecord {
            query: query.to_string(),
            cached_at: chrono::Utc::now().to_rfc3339(),
            payload: payload.clone(),
        };
        self.with_slot(query, |slot| {
            self.write_atomic(&path, &record)?;
            debug!("cached {:?} under {}", query, slot.key());
            Ok(())
        })?;
        Ok(path)
    }
}
