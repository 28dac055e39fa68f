//! GitHub tree provider.
//!
//! Resolves refs via `GET {api}/repos/{repo}/commits/{ref}`, lists trees via
//! `GET {api}/repos/{repo}/git/trees/{sha}?recursive=1` and fetches file
//! bytes from the raw content host.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;

use super::{status_error, EntryType, ProviderError, ProviderFuture, TreeEntry, TreeProvider};

const USER_AGENT: &str = concat!("screenmap/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct RawTreeEntry {
    path: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(rename = "type")]
    kind: String,
}

/// `TreeProvider` backed by the GitHub REST API.
pub struct GitHubProvider {
    http: Client,
    api_base: String,
    raw_base: String,
}

impl GitHubProvider {
    pub fn new(api_base: &str, raw_base: &str) -> Result<Self, ProviderError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
        })
    }

    fn headers(token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get(&self, url: &str, token: Option<&str>, what: &str) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .get(url)
            .headers(Self::headers(token))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(e)
                }
            })?;

        match status_error(response.status().as_u16(), what) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }
}

/// Percent-encode the characters of a path segment that break URLs.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '%' => out.push_str("%25"),
            c => out.push(c),
        }
    }
    out
}

fn convert_entries(raw: Vec<RawTreeEntry>) -> Vec<TreeEntry> {
    raw.into_iter()
        .filter_map(|e| {
            let entry_type = match e.kind.as_str() {
                "blob" => EntryType::Blob,
                "tree" => EntryType::Tree,
                // Submodules ("commit") have no content in this repo.
                _ => return None,
            };
            Some(TreeEntry {
                path: e.path,
                sha: e.sha,
                size: e.size.unwrap_or(0),
                entry_type,
            })
        })
        .collect()
}

impl TreeProvider for GitHubProvider {
    fn resolve_commit<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let url = format!("{}/repos/{}/commits/{}", self.api_base, repo, encode_path(reference));
            let response = self.get(&url, token, &format!("{}@{}", repo, reference)).await?;
            let commit: CommitResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))?;
            Ok(commit.sha)
        })
    }

    fn list_tree<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<TreeEntry>> {
        Box::pin(async move {
            let url = format!(
                "{}/repos/{}/git/trees/{}?recursive=1",
                self.api_base,
                repo,
                encode_path(reference)
            );
            let response = self.get(&url, token, &format!("{}@{}", repo, reference)).await?;
            let tree: TreeResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))?;
            if tree.truncated {
                tracing::warn!(repo, reference, "GitHub truncated the tree listing");
            }
            Ok(convert_entries(tree.tree))
        })
    }

    fn get_content<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        path: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let url = format!(
                "{}/{}/{}/{}",
                self.raw_base,
                repo,
                encode_path(reference),
                encode_path(path)
            );
            let response = self.get(&url, token, path).await?;
            let bytes = response.bytes().await.map_err(ProviderError::Network)?;
            Ok(bytes.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("src/app/page.tsx"), "src/app/page.tsx");
        assert_eq!(encode_path("docs/my file#1.md"), "docs/my%20file%231.md");
    }

    #[test]
    fn test_convert_entries_skips_submodules() {
        let raw: TreeResponse = serde_json::from_str(
            r#"{
                "sha": "abc",
                "tree": [
                    {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
                    {"path": "src/app/page.tsx", "mode": "100644", "type": "blob", "sha": "b1", "size": 120},
                    {"path": "vendor/lib", "mode": "160000", "type": "commit", "sha": "c1"}
                ],
                "truncated": false
            }"#,
        )
        .unwrap();
        let entries = convert_entries(raw.tree);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], TreeEntry::blob("src/app/page.tsx", "b1", 120));
        assert_eq!(entries[0].entry_type, EntryType::Tree);
    }

    #[test]
    fn test_base_urls_are_trimmed() {
        let provider = GitHubProvider::new("https://api.github.com/", "https://raw.githubusercontent.com/").unwrap();
        assert_eq!(provider.api_base, "https://api.github.com");
        assert_eq!(provider.raw_base, "https://raw.githubusercontent.com");
    }

    #[test]
    fn test_headers_include_token() {
        let headers = GitHubProvider::headers(Some("secret"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
        let headers = GitHubProvider::headers(Some(""));
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
