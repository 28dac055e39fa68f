//! File-backed record store.
//!
//! One JSON file per key under the store directory (by default the
//! platform data dir, e.g. ~/.local/share/screenmap/records/). Writes go to
//! a temp file first and are renamed into place.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use directories::ProjectDirs;

use super::{RecordStore, StoreError, StoreFuture};
use crate::graph::ids;

/// Per-process suffix for temp files, so concurrent writers of one key never
/// share a temp path.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform data directory.
    pub fn default_location() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("", "", "screenmap").ok_or(StoreError::NoDirectory)?;
        Ok(Self::new(dirs.data_dir().join("records")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> PathBuf {
        // Sanitized keys can collide (`a/b` vs `a_b`), so a short key hash
        // keeps file names unique.
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        let hash = ids::content_hash(key.as_bytes());
        self.dir.join(format!("{}-{}.json", sanitized, &hash[..8]))
    }

    fn temp_for(path: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}-{}.tmp", std::process::id(), n))
    }
}

impl RecordStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.file_for(key)).await {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir).await?;
            let path = self.file_for(key);
            let tmp = Self::temp_for(&path);
            if let Err(e) = tokio::fs::write(&tmp, value).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e.into());
            }
            tokio::fs::rename(&tmp, &path).await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.file_for(key)).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_and_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("records"));

        assert_eq!(store.get("analysis:acme/shop:main").await.unwrap(), None);
        store
            .set("analysis:acme/shop:main", "{\"v\":1}".to_string())
            .await
            .unwrap();
        store
            .set("analysis:acme/shop:main", "{\"v\":2}".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("analysis:acme/shop:main").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );

        let files: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let key = "analysis:acme/shop:main";
        let small = "{\"v\":1}".to_string();
        let large = format!("{{\"v\":\"{}\"}}", "x".repeat(64 * 1024));

        let writes = (0..8).map(|i| {
            let value = if i % 2 == 0 { small.clone() } else { large.clone() };
            store.set(key, value)
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let stored = store.get(key).await.unwrap().unwrap();
        assert!(stored == small || stored == large);
        serde_json::from_str::<serde_json::Value>(&stored).unwrap();
        let files: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(files.len(), 1, "temp files left behind");
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.set("analysis-id:a", "k".to_string()).await.unwrap();
        store.remove("analysis-id:a").await.unwrap();
        assert_eq!(store.get("analysis-id:a").await.unwrap(), None);
        store.remove("analysis-id:a").await.unwrap();
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/tmp/records/analysis-1234abcd.json");
        assert_ne!(FileStore::temp_for(path), FileStore::temp_for(path));
    }

    #[test]
    fn test_keys_do_not_collide() {
        let store = FileStore::new("/tmp/records");
        assert_ne!(store.file_for("analysis:a/b:main"), store.file_for("analysis:a_b:main"));
    }
}
