use crate::error::{PlaneError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

/// Default bound on the on-disk cache size.
pub const DEFAULT_SIZE_LIMIT: u64 = 100 * 1024 * 1024;

const ENTRY_EXTENSION: &str = "json";

/// Key/value storage with per-entry expiry.
pub trait CacheStore: Send + Sync {
    /// Live value for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    expires_at: DateTime<Utc>,
    value: Value,
}

/// One JSON file per key under a root directory.
///
/// Writes are atomic and serialized within the process; the directory is kept
/// under `size_limit` bytes by evicting expired, then least recently written, entries.
pub struct DiskStore {
    root: PathBuf,
    size_limit: u64,
    write_lock: Mutex<()>,
}

impl DiskStore {
    pub fn open(root: &Path, size_limit: u64) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            size_limit,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root
            .join(format!("{:x}.{}", digest, ENTRY_EXTENSION))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| PlaneError::Cache("cache write lock poisoned".to_string()))
    }

    fn entry_files(&self) -> Result<Vec<(PathBuf, u64, SystemTime)>> {
        let mut files = Vec::new();
        if !self.root.exists() {
            return Ok(files);
        }
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let meta = std::fs::metadata(&path)?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((path, meta.len(), modified));
        }
        Ok(files)
    }

    fn enforce_size_limit(&self) -> Result<()> {
        let mut files = self.entry_files()?;
        let mut total: u64 = files.iter().map(|(_, len, _)| len).sum();
        if total <= self.size_limit {
            return Ok(());
        }

        let now = Utc::now();
        files.retain(|(path, len, _)| {
            if total > self.size_limit && read_entry(path).is_none_or(|e| e.expires_at <= now) {
                if std::fs::remove_file(path).is_ok() {
                    total = total.saturating_sub(*len);
                }
                return false;
            }
            true
        });

        files.sort_by_key(|(_, _, modified)| *modified);
        for (path, len, _) in files {
            if total <= self.size_limit {
                break;
            }
            std::fs::remove_file(&path)?;
            total = total.saturating_sub(len);
            tracing::debug!(path = %path.display(), "Evicted cache entry");
        }
        Ok(())
    }

    fn atomic_write(&self, target: &Path, content: &[u8]) -> Result<()> {
        let mut temp_file = NamedTempFile::new_in(&self.root)?;
        temp_file.write_all(content)?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(target)
            .map_err(|e| PlaneError::Cache(format!("failed to persist cache entry: {}", e)))?;
        Ok(())
    }
}

fn read_entry(path: &Path) -> Option<StoredEntry> {
    let content = std::fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
}

impl CacheStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(key);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: StoredEntry = serde_json::from_slice(&content)?;
        if entry.key != key {
            return Ok(None);
        }
        if entry.expires_at <= Utc::now() {
            let _ = std::fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| PlaneError::Cache(format!("invalid TTL: {}", e)))?;
        let entry = StoredEntry {
            key: key.to_string(),
            expires_at: Utc::now() + ttl,
            value: value.clone(),
        };
        let content = serde_json::to_vec(&entry)?;

        let _guard = self.lock()?;
        std::fs::create_dir_all(&self.root)?;
        self.atomic_write(&self.entry_path(key), &content)?;
        self.enforce_size_limit()
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock()?;
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        for (path, _, _) in self.entry_files()? {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Zero-capacity store: every write is dropped, every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CacheStore for NullStore {
    fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
