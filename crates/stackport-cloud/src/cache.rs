//! Listing cache
//!
//! Holds one ordered list of [`Summary`] per resource kind. A present key means
//! "believed consistent with the engine as of the last write"; an absent key
//! means the list must be rebuilt before it is served.
//!
//! [`FileCache`] keeps entries as JSON files under a cache directory so that
//! they outlive the process; [`MemoryCache`] is an in-process map.

use crate::summary::Summary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

const CACHE_VERSION: u32 = 1;
const ENTRY_EXTENSION: &str = "json";

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No cache entry for '{0}'")]
    NotFound(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Cache entry '{key}' has version {found}, newer than supported version {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key/value store of listing summaries
///
/// Writes always replace the whole list for a key.
#[async_trait]
pub trait ListingCache: Send + Sync {
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    async fn get(&self, key: &str) -> CacheResult<Vec<Summary>>;

    async fn set(&self, key: &str, summaries: &[Summary]) -> CacheResult<()>;

    /// Drop the entry so the next listing rebuilds it
    async fn invalidate(&self, key: &str) -> CacheResult<()>;
}

/// On-disk form of one cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    updated_at: DateTime<Utc>,
    summaries: Vec<Summary>,
}

/// File-backed listing cache
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> CacheResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }

    /// Ensure the cache directory exists
    async fn ensure_dir(&self) -> CacheResult<()> {
        if !fs::try_exists(&self.dir).await? {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!("Created cache directory: {}", self.dir.display());
        }
        Ok(())
    }
}

#[async_trait]
impl ListingCache for FileCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let path = self.entry_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn get(&self, key: &str) -> CacheResult<Vec<Summary>> {
        let path = self.entry_path(key)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if entry.version > CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                key: key.to_string(),
                found: entry.version,
                supported: CACHE_VERSION,
            });
        }

        tracing::debug!(
            key,
            updated_at = %entry.updated_at,
            "Loaded {} cached summaries",
            entry.summaries.len()
        );
        Ok(entry.summaries)
    }

    async fn set(&self, key: &str, summaries: &[Summary]) -> CacheResult<()> {
        let path = self.entry_path(key)?;
        self.ensure_dir().await?;

        let entry = CacheEntry {
            version: CACHE_VERSION,
            updated_at: Utc::now(),
            summaries: summaries.to_vec(),
        };
        let content = serde_json::to_string_pretty(&entry)?;

        // Each writer gets its own temp file in the cache dir; the rename is atomic
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> CacheResult<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(content.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        tracing::debug!(key, "Saved {} summaries", summaries.len());
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, "Invalidated cache entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys become file names, so keep them to a safe alphabet
fn validate_key(key: &str) -> CacheResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// In-process listing cache
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<Summary>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingCache for MemoryCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> CacheResult<Vec<Summary>> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, summaries: &[Summary]) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), summaries.to_vec());
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Summary> {
        vec![
            Summary::site(
                "demo",
                "http://demo.s3-website.example.com",
                "https://app.pulumi.com/acme/stackport/demo".to_string(),
            ),
            Summary::site(
                "blog",
                "http://blog.s3-website.example.com",
                "https://app.pulumi.com/acme/stackport/blog".to_string(),
            )
            .with_owner(Some("user-7".to_string())),
        ]
    }

    #[tokio::test]
    async fn test_file_cache_set_get() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path().join("listing"));

        assert!(!cache.exists("sites").await.unwrap());

        cache.set("sites", &sample()).await.unwrap();

        assert!(cache.exists("sites").await.unwrap());
        assert_eq!(cache.get("sites").await.unwrap(), sample());
        assert!(!cache.exists("vms").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_cache_missing_entry() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path());

        let err = cache.get("vms").await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound(ref key) if key == "vms"));
    }

    #[tokio::test]
    async fn test_file_cache_empty_list_is_present() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path());

        cache.set("vms", &[]).await.unwrap();

        assert!(cache.exists("vms").await.unwrap());
        assert!(cache.get("vms").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_cache_invalidate() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path());

        cache.set("sites", &sample()).await.unwrap();
        cache.invalidate("sites").await.unwrap();
        assert!(!cache.exists("sites").await.unwrap());

        // Invalidating twice is fine
        cache.invalidate("sites").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_cache_rejects_newer_version() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path());

        let entry = serde_json::json!({
            "version": CACHE_VERSION + 1,
            "updated_at": "2026-01-01T00:00:00Z",
            "summaries": [],
        });
        std::fs::write(temp_dir.path().join("sites.json"), entry.to_string()).unwrap();

        let err = cache.get("sites").await.unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedVersion { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_cache_concurrent_writers() {
        let temp_dir = tempdir().unwrap();
        let big: Vec<Summary> = (0..500)
            .map(|i| {
                Summary::site(
                    format!("site-{i}"),
                    format!("http://site-{i}.s3-website.example.com"),
                    format!("https://app.pulumi.com/acme/stackport/site-{i}"),
                )
            })
            .collect();

        // Separate instances stand in for separate processes sharing the directory
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = FileCache::new(temp_dir.path());
            let summaries = big.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..10 {
                    cache.set("sites", &summaries).await?;
                    cache.get("sites").await?;
                }
                Ok::<_, CacheError>(())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let cache = FileCache::new(temp_dir.path());
        assert_eq!(cache.get("sites").await.unwrap(), big);
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_file_cache_rejects_path_keys() {
        let temp_dir = tempdir().unwrap();
        let cache = FileCache::new(temp_dir.path());

        let err = cache.set("../sites", &[]).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryCache::new();

        assert!(!cache.exists("sites").await.unwrap());
        cache.set("sites", &sample()).await.unwrap();
        assert_eq!(cache.get("sites").await.unwrap(), sample());

        cache.invalidate("sites").await.unwrap();
        assert!(matches!(
            cache.get("sites").await,
            Err(CacheError::NotFound(_))
        ));
    }
}
