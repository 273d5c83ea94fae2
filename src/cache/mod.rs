//! Read-through disk cache for API listings.
//!
//! Keys look like `<url-hash>:<resource>:<workspace>[:<project>]`, where the
//! URL hash is the first 12 hex digits of SHA-256 over the API base URL, so two
//! Plane instances never share entries.
//!
//! ## Components
//!
//! - [`ApiCache`]: key construction, `cached_list`, invalidation
//! - [`CacheStore`]: storage backend ([`DiskStore`] or the no-op [`NullStore`])
//! - [`CachedResource`]: the cached listings and their TTL classes

mod store;

pub use store::{CacheStore, DEFAULT_SIZE_LIMIT, DiskStore, NullStore};

use crate::error::{PlaneError, Result};
use crate::model::Record;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Members and the caller's identity.
pub const TTL_STATIC: Duration = Duration::from_secs(60 * 60);
/// States, labels, and estimate points.
pub const TTL_CONFIG: Duration = Duration::from_secs(10 * 60);
/// Projects, modules, cycles.
pub const TTL_MODERATE: Duration = Duration::from_secs(5 * 60);
/// Work items.
pub const TTL_WORK_ITEMS: Duration = Duration::from_secs(2 * 60);

const APP_NAME: &str = "planecli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedResource {
    Projects,
    Members,
    Me,
    States,
    Labels,
    Modules,
    Cycles,
    WorkItems,
    EstimatePoints,
}

impl CachedResource {
    pub const ALL: [CachedResource; 9] = [
        CachedResource::Projects,
        CachedResource::Members,
        CachedResource::Me,
        CachedResource::States,
        CachedResource::Labels,
        CachedResource::Modules,
        CachedResource::Cycles,
        CachedResource::WorkItems,
        CachedResource::EstimatePoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CachedResource::Projects => "projects",
            CachedResource::Members => "members",
            CachedResource::Me => "me",
            CachedResource::States => "states",
            CachedResource::Labels => "labels",
            CachedResource::Modules => "modules",
            CachedResource::Cycles => "cycles",
            CachedResource::WorkItems => "work_items",
            CachedResource::EstimatePoints => "estimate_points",
        }
    }

    pub fn ttl(&self) -> Duration {
        match self {
            CachedResource::Members | CachedResource::Me => TTL_STATIC,
            CachedResource::States
            | CachedResource::Labels
            | CachedResource::EstimatePoints => TTL_CONFIG,
            CachedResource::Projects | CachedResource::Modules | CachedResource::Cycles => {
                TTL_MODERATE
            }
            CachedResource::WorkItems => TTL_WORK_ITEMS,
        }
    }

    /// Whether entries are scoped to a single project.
    pub fn is_project_scoped(&self) -> bool {
        matches!(
            self,
            CachedResource::States
                | CachedResource::Labels
                | CachedResource::Modules
                | CachedResource::Cycles
                | CachedResource::WorkItems
                | CachedResource::EstimatePoints
        )
    }
}

impl fmt::Display for CachedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachedResource {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace('-', "_");
        CachedResource::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = CachedResource::ALL.iter().map(|r| r.as_str()).collect();
                PlaneError::validation(
                    format!("Unknown cached resource: {}", s),
                    format!("Use one of: {}.", names.join(", ")),
                )
            })
    }
}

/// Platform cache directory: `~/Library/Caches/planecli` on macOS,
/// `$XDG_CACHE_HOME/planecli` or `~/.cache/planecli` elsewhere.
pub fn cache_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.cache_dir().join(APP_NAME))
}

/// Short digest of the API base URL used to namespace keys.
pub fn url_hash(base_url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(base_url.as_bytes()));
    digest[..12].to_string()
}

#[derive(Clone)]
pub struct ApiCache {
    store: Arc<dyn CacheStore>,
    url_hash: String,
    no_cache: bool,
    dir: Option<PathBuf>,
}

impl ApiCache {
    pub fn new(store: Arc<dyn CacheStore>, base_url: &str, no_cache: bool) -> Self {
        Self {
            store,
            url_hash: url_hash(base_url),
            no_cache,
            dir: None,
        }
    }

    /// Disk-backed cache rooted at `dir`; falls back to [`NullStore`] if the
    /// directory cannot be created.
    pub fn open(dir: &Path, base_url: &str, no_cache: bool) -> Self {
        match DiskStore::open(dir, DEFAULT_SIZE_LIMIT) {
            Ok(store) => Self {
                dir: Some(dir.to_path_buf()),
                ..Self::new(Arc::new(store), base_url, no_cache)
            },
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Cache unavailable, continuing without it"
                );
                Self::disabled(base_url)
            }
        }
    }

    pub fn disabled(base_url: &str) -> Self {
        Self::new(Arc::new(NullStore), base_url, false)
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn key(
        &self,
        resource: CachedResource,
        workspace: &str,
        project_id: Option<&str>,
    ) -> String {
        match project_id {
            Some(project_id) => format!(
                "{}:{}:{}:{}",
                self.url_hash,
                resource.as_str(),
                workspace,
                project_id
            ),
            None => format!("{}:{}:{}", self.url_hash, resource.as_str(), workspace),
        }
    }

    /// Return the cached list under `key`, or run `fetch` and store its result.
    ///
    /// In no-cache mode the read is skipped but the fresh result is still
    /// written. Cache failures are logged and never reach the caller.
    pub async fn cached_list<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Vec<Record>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        if !self.no_cache {
            match self.read(key) {
                Ok(Some(records)) => {
                    tracing::debug!(key, "Cache hit");
                    return Ok(records);
                }
                Ok(None) => tracing::debug!(key, "Cache miss"),
                Err(e) => tracing::warn!(key, error = %e, "Cache read error, fetching from API"),
            }
        }

        let records = fetch().await?;

        let value = Value::Array(records.iter().cloned().map(Value::Object).collect());
        if let Err(e) = self.store.set(key, &value, ttl) {
            tracing::warn!(key, error = %e, "Cache write error");
        }
        Ok(records)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<Record>>> {
        match self.store.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Drop exactly one cached listing.
    pub fn invalidate(&self, resource: CachedResource, workspace: &str, project_id: Option<&str>) {
        let key = self.key(resource, workspace, project_id);
        if let Err(e) = self.store.delete(&key) {
            tracing::warn!(key, error = %e, "Cache invalidation error");
        }
    }

    /// Drop every entry; if the store cannot clear itself, empty the directory.
    pub fn invalidate_all(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Cache clear failed, removing entries directly");
            if let Some(dir) = &self.dir {
                if let Err(e) = remove_dir_contents(dir) {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "Could not empty cache directory"
                    );
                }
            }
        }
    }
}

/// Remove everything under `dir`, keeping `dir` itself.
fn remove_dir_contents(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove cache entry");
        }
    }
    Ok(())
}
