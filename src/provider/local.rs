//! Tree provider over a directory on disk.
//!
//! The working tree stands in for a commit: each blob's sha is the SHA-256
//! of its content, and the "commit" is a fingerprint over every
//! (path, sha) pair, so an unchanged directory resolves to the same commit.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ProviderError, ProviderFuture, TreeEntry, TreeProvider};
use crate::graph::ids;
use crate::paths;

/// `TreeProvider` that reads a local checkout. `repo` and `reference`
/// arguments are labels only.
pub struct LocalTreeProvider {
    root: PathBuf,
}

impl LocalTreeProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(root: &Path) -> Result<Vec<TreeEntry>, ProviderError> {
        if !root.is_dir() {
            return Err(ProviderError::NotFound(root.display().to_string()));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir() && e.depth() > 0 && paths::is_ignored(&name))
            })
        {
            let entry = entry.map_err(|e| ProviderError::Io(std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => paths::normalize(&rel.to_string_lossy()),
                Err(_) => continue,
            };
            let content = std::fs::read(entry.path())?;
            entries.push(TreeEntry::blob(
                &relative,
                &ids::content_hash(&content),
                content.len() as u64,
            ));
        }
        Ok(entries)
    }

    async fn entries(&self) -> Result<Vec<TreeEntry>, ProviderError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::walk(&root))
            .await
            .map_err(|e| ProviderError::Io(std::io::Error::other(e.to_string())))?
    }

    fn resolve_path(&self, path: &str) -> Result<PathBuf, ProviderError> {
        let normalized = paths::normalize(path);
        if normalized.is_empty() || normalized.split('/').any(|s| s == "..") {
            return Err(ProviderError::NotFound(path.to_string()));
        }
        Ok(self.root.join(normalized))
    }
}

/// Stable fingerprint over a tree listing.
fn tree_fingerprint(entries: &[TreeEntry]) -> String {
    let mut pairs: Vec<(&str, &str)> = entries
        .iter()
        .filter(|e| e.is_blob())
        .map(|e| (e.path.as_str(), e.sha.as_str()))
        .collect();
    pairs.sort();
    let mut manifest = String::new();
    for (path, sha) in pairs {
        manifest.push_str(path);
        manifest.push(' ');
        manifest.push_str(sha);
        manifest.push('\n');
    }
    ids::content_hash(manifest.as_bytes())
}

impl TreeProvider for LocalTreeProvider {
    fn resolve_commit<'a>(
        &'a self,
        _repo: &'a str,
        _reference: &'a str,
        _token: Option<&'a str>,
    ) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let entries = self.entries().await?;
            Ok(tree_fingerprint(&entries))
        })
    }

    fn list_tree<'a>(
        &'a self,
        _repo: &'a str,
        _reference: &'a str,
        _token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<TreeEntry>> {
        Box::pin(self.entries())
    }

    fn get_content<'a>(
        &'a self,
        _repo: &'a str,
        _reference: &'a str,
        path: &'a str,
        _token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let full = self.resolve_path(path)?;
            match tokio::fs::read(&full).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ProviderError::NotFound(path.to_string()))
                }
                Err(e) => Err(ProviderError::Io(e)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/pages")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/react")).unwrap();
        fs::write(dir.path().join("src/pages/index.tsx"), "export default function Home() {}").unwrap();
        fs::write(dir.path().join("node_modules/react/index.js"), "module.exports = {}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_tree_skips_ignored_dirs() {
        let dir = fixture();
        let provider = LocalTreeProvider::new(dir.path());
        let entries = provider.list_tree("local", "HEAD", None).await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src/pages/index.tsx"]);
        assert_eq!(entries[0].sha.len(), 64);
    }

    #[tokio::test]
    async fn test_commit_tracks_content() {
        let dir = fixture();
        let provider = LocalTreeProvider::new(dir.path());
        let c1 = provider.resolve_commit("local", "HEAD", None).await.unwrap();
        let again = provider.resolve_commit("local", "HEAD", None).await.unwrap();
        assert_eq!(c1, again);

        fs::write(dir.path().join("src/pages/index.tsx"), "export default function Home() { return 1 }").unwrap();
        let c2 = provider.resolve_commit("local", "HEAD", None).await.unwrap();
        assert_ne!(c1, c2);
    }

    #[tokio::test]
    async fn test_get_content_rejects_escapes() {
        let dir = fixture();
        let provider = LocalTreeProvider::new(dir.path());
        let bytes = provider
            .get_content("local", "HEAD", "src/pages/index.tsx", None)
            .await
            .unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("Home"));

        let err = provider
            .get_content("local", "HEAD", "../../etc/passwd", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let provider = LocalTreeProvider::new("/definitely/not/here");
        let err = provider.list_tree("local", "HEAD", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
