//! Job cache: job key → finished artifact.
//!
//! Persisted as a single JSON snapshot that is read on every lookup and
//! rewritten wholesale on every store. Writes go to a temporary file that is
//! renamed over the snapshot, so readers never see half a file. A missing or
//! corrupt snapshot reads as empty.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub title: String,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

type Snapshot = BTreeMap<String, JobResult>;

/// File-backed job cache. One instance per process.
pub struct JobCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JobCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Result stored under `key`. Entries whose artifact disappeared from
    /// disk count as misses.
    pub async fn lookup(&self, key: &str) -> Option<JobResult> {
        let result = self.load().await.remove(key)?;

        if !tokio::fs::try_exists(&result.path).await.unwrap_or(false) {
            warn!(job_key = %key, path = %result.path.display(), "Cached artifact is missing, ignoring entry");
            return None;
        }
        Some(result)
    }

    /// Store `result` under `key`. Serialized with other stores in this process.
    pub async fn store(&self, key: &str, result: JobResult) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.load().await;
        snapshot.insert(key.to_string(), result);
        self.write_snapshot(&snapshot).await?;

        debug!(job_key = %key, entries = snapshot.len(), "Job cache updated");
        Ok(())
    }

    /// Number of entries in the snapshot.
    pub async fn len(&self) -> usize {
        self.load().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn load(&self) -> Snapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Snapshot::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read job cache, treating as empty");
                return Snapshot::new();
            }
        };

        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Job cache is corrupt, treating as empty");
            Snapshot::new()
        })
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(std::io::Error::from)
            .and_then(|written| written)
            .map_err(|source| CacheError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Write `bytes` to a fresh file next to `path`, then rename it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn artifact(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"epub").unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path().join("saved_epubs.json"));

        assert_eq!(cache.lookup("abc").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved_epubs.json");
        std::fs::write(&path, b"{not json").unwrap();
        let cache = JobCache::new(&path);

        assert_eq!(cache.lookup("abc").await, None);

        // A store repairs the snapshot
        let result = JobResult {
            title: "Book".into(),
            path: artifact(dir.path(), "abc.epub"),
        };
        cache.store("abc", result.clone()).await.unwrap();
        assert_eq!(cache.lookup("abc").await, Some(result));
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path().join("nested/saved_epubs.json"));
        let result = JobResult {
            title: "My Series".into(),
            path: artifact(dir.path(), "k.epub"),
        };

        tokio_test::assert_ok!(cache.store("k", result.clone()).await);

        assert_eq!(cache.lookup("k").await, Some(result));
        assert_eq!(cache.lookup("other").await, None);
        // Only the snapshot itself, no leftover temporary file
        assert_eq!(std::fs::read_dir(dir.path().join("nested")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_reads_legacy_snapshot_format() {
        let dir = tempfile::tempdir().unwrap();
        let epub = artifact(dir.path(), "5d41402abc4b2a76b9719d911017c592.epub");
        let path = dir.path().join("saved_epubs.json");
        let legacy = serde_json::json!({
            "5d41402abc4b2a76b9719d911017c592": { "title": "Legacy", "path": epub }
        });
        std::fs::write(&path, legacy.to_string()).unwrap();

        let cache = JobCache::new(&path);
        let found = cache.lookup("5d41402abc4b2a76b9719d911017c592").await.unwrap();
        assert_eq!(found.title, "Legacy");
    }

    #[tokio::test]
    async fn test_entry_with_missing_artifact_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path().join("saved_epubs.json"));
        let path = artifact(dir.path(), "gone.epub");
        cache
            .store("gone", JobResult { title: "Gone".into(), path: path.clone() })
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();

        assert_eq!(cache.lookup("gone").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_stores_keep_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(JobCache::new(dir.path().join("saved_epubs.json")));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let cache = cache.clone();
                let path = artifact(dir.path(), &format!("{i}.epub"));
                tokio::spawn(async move {
                    cache
                        .store(&i.to_string(), JobResult { title: format!("Book {i}"), path })
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(cache.len().await, 10);
    }
}
