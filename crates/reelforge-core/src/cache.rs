use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::Result;

const INDEX_FILE: &str = "cache_index.json";

/// Content-addressed store for downloaded footage clips.
///
/// Clips are keyed by the sha256 of their source URL, so re-requesting the
/// same URL reuses the file on disk. The on-disk index is rewritten through a
/// temp file and an atomic rename, serialized by a mutex, so concurrent video
/// builds cannot leave it corrupted.
pub struct FootageCache {
    root: PathBuf,
    index_path: PathBuf,
    index: Mutex<HashMap<String, PathBuf>>,
}

/// Default cache root under the platform cache directory.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("reelforge")
        .join("footage")
}

/// Hex sha256 of a source URL, used as the cache key.
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

impl FootageCache {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let index_path = root.join(INDEX_FILE);
        let index = match std::fs::read_to_string(&index_path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            root: root.to_path_buf(),
            index_path,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a clip with the given provider id and cache key lives on disk.
    pub fn entry_path(&self, id: &str, key: &str) -> PathBuf {
        let short = &key[..key.len().min(8)];
        self.root.join(format!("clip_{id}_{short}.mp4"))
    }

    /// Returns the cached path for `key` if the file still exists.
    pub async fn lookup(&self, key: &str) -> Option<PathBuf> {
        let index = self.index.lock().await;
        let path = index.get(key)?.clone();
        drop(index);
        if fs::try_exists(&path).await.unwrap_or(false) {
            Some(path)
        } else {
            None
        }
    }

    /// Record `key -> path` and persist the index atomically.
    pub async fn insert(&self, key: &str, path: &Path) -> Result<()> {
        let mut index = self.index.lock().await;
        index.insert(key.to_string(), path.to_path_buf());
        let serialized = serde_json::to_string_pretty(&*index)?;
        let tmp = self.index_path.with_extension("json.tmp");
        fs::write(&tmp, serialized).await?;
        fs::rename(&tmp, &self.index_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_and_distinct() {
        let a = cache_key("https://example.com/a.mp4");
        let b = cache_key("https://example.com/b.mp4");
        assert_eq!(a, cache_key("https://example.com/a.mp4"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn insert_then_lookup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FootageCache::open(dir.path()).unwrap();

        let key = cache_key("https://example.com/clip.mp4");
        let path = cache.entry_path("12345", &key);
        fs::write(&path, b"fake video").await.unwrap();

        assert!(cache.lookup(&key).await.is_none());
        cache.insert(&key, &path).await.unwrap();
        assert_eq!(cache.lookup(&key).await, Some(path));

        // No leftover temp file from the atomic rewrite.
        assert!(!dir.path().join("cache_index.json.tmp").exists());
        assert!(dir.path().join("cache_index.json").exists());
    }

    #[tokio::test]
    async fn lookup_ignores_entries_whose_file_vanished() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FootageCache::open(dir.path()).unwrap();

        let key = cache_key("https://example.com/gone.mp4");
        cache
            .insert(&key, &dir.path().join("missing.mp4"))
            .await
            .unwrap();
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = cache_key("https://example.com/persist.mp4");
        let path = dir.path().join("persist.mp4");
        fs::write(&path, b"x").await.unwrap();

        {
            let cache = FootageCache::open(dir.path()).unwrap();
            cache.insert(&key, &path).await.unwrap();
        }
        let reopened = FootageCache::open(dir.path()).unwrap();
        assert_eq!(reopened.lookup(&key).await, Some(path));
    }
}
