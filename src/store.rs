use crate::errors::{DataSourceError, LoadResult};
use crate::loader;
use crate::record::ProjectRecord;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// When a cached record batch may be reused instead of reloading the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Reload on every request.
    Never,
    /// Keep the first batch until `RecordStore::invalidate` is called.
    Forever,
    /// Reload whenever the source file's modification time changes.
    #[default]
    #[serde(rename = "mtime")]
    ModifiedTime,
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" | "off" => Ok(CachePolicy::Never),
            "forever" | "always" => Ok(CachePolicy::Forever),
            "mtime" | "modified" | "modified-time" => Ok(CachePolicy::ModifiedTime),
            other => Err(format!("unknown cache policy '{other}'")),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CachePolicy::Never => "never",
            CachePolicy::Forever => "forever",
            CachePolicy::ModifiedTime => "mtime",
        };
        f.write_str(name)
    }
}

struct CacheEntry {
    records: Arc<[ProjectRecord]>,
    modified: Option<SystemTime>,
}

/// Loads the project batch from one source and memoizes it per `CachePolicy`.
///
/// The lock is held across a reload, so concurrent callers never load the
/// same source twice in parallel. Batches are handed out as shared slices and
/// are never mutated after loading.
pub struct RecordStore {
    source: PathBuf,
    policy: CachePolicy,
    cache: Mutex<Option<CacheEntry>>,
}

impl RecordStore {
    pub fn new(source: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        RecordStore {
            source: source.into(),
            policy,
            cache: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Current record batch, loading the source if the cache is cold or stale.
    pub fn records(&self) -> LoadResult<Arc<[ProjectRecord]>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = cache.as_ref() {
            if self.is_fresh(entry)? {
                debug!("record cache hit for {}", self.source.display());
                return Ok(Arc::clone(&entry.records));
            }
            info!("source {} changed, reloading", self.source.display());
        }

        let modified = modified_time(&self.source);
        let records: Arc<[ProjectRecord]> = loader::load(&self.source)?.into();

        if self.policy != CachePolicy::Never {
            *cache = Some(CacheEntry {
                records: Arc::clone(&records),
                modified,
            });
        }
        Ok(records)
    }

    /// Drop the cached batch; the next `records` call reloads.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.take().is_some() {
            debug!("record cache for {} invalidated", self.source.display());
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> LoadResult<bool> {
        match self.policy {
            CachePolicy::Never => Ok(false),
            CachePolicy::Forever => Ok(true),
            CachePolicy::ModifiedTime => {
                if !self.source.exists() {
                    return Err(DataSourceError::NotFound(self.source.clone()));
                }
                let current = modified_time(&self.source);
                Ok(entry.modified.is_some() && entry.modified == current)
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("never".parse::<CachePolicy>(), Ok(CachePolicy::Never));
        assert_eq!("Forever".parse::<CachePolicy>(), Ok(CachePolicy::Forever));
        assert_eq!("mtime".parse::<CachePolicy>(), Ok(CachePolicy::ModifiedTime));
        assert!("sometimes".parse::<CachePolicy>().is_err());
        assert_eq!(CachePolicy::default().to_string(), "mtime");
    }

    #[test]
    fn missing_source_is_fatal_and_not_cached() {
        let store = RecordStore::new("nowhere/projets.xlsx", CachePolicy::Forever);
        assert!(matches!(store.records(), Err(DataSourceError::NotFound(_))));
        assert!(!store.is_cached());
    }
}
