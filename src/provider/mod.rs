//! External collaborators: tree/content providers and screenshot capture.
//!
//! The engine only depends on the capability traits defined here. Adapters:
//! - `GitHubProvider`: GitHub REST API + raw content host
//! - `LocalTreeProvider`: a directory on disk
//! - `HttpCaptureProvider`: an HTTP screenshot service

mod capture;
mod github;
mod local;
mod retry;

pub use capture::HttpCaptureProvider;
pub use github::GitHubProvider;
pub use local::LocalTreeProvider;
pub use retry::{with_retry, RetryPolicy};

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::CaptureStatus;

/// Boxed future returned by provider traits so they stay dyn-compatible.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Errors raised by external providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by provider")]
    RateLimited,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("capture rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout
            | ProviderError::RateLimited
            | ProviderError::Rejected(_) => true,
            ProviderError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// Kind of tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
}

/// One entry of a repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    /// Content hash (git blob sha or SHA-256 of content).
    pub sha: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl TreeEntry {
    pub fn blob(path: &str, sha: &str, size: u64) -> Self {
        Self {
            path: path.to_string(),
            sha: sha.to_string(),
            size,
            entry_type: EntryType::Blob,
        }
    }

    pub fn is_blob(&self) -> bool {
        self.entry_type == EntryType::Blob
    }
}

/// Lists repository trees and fetches file content.
pub trait TreeProvider: Send + Sync {
    /// Resolve a branch or ref to a commit sha.
    fn resolve_commit<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, String>;

    /// List every entry of the tree at `reference`.
    fn list_tree<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<TreeEntry>>;

    /// Fetch the raw bytes of one file.
    fn get_content<'a>(
        &'a self,
        repo: &'a str,
        reference: &'a str,
        path: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>>;
}

/// What a capture provider reported for one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub status: CaptureStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Renders a page and returns where the screenshot lives.
pub trait CaptureProvider: Send + Sync {
    fn capture<'a>(&'a self, url: &'a str, screen_path: &'a str) -> ProviderFuture<'a, CaptureOutcome>;
}

/// Map an HTTP status to a provider error (None for success).
pub(crate) fn status_error(status: u16, what: &str) -> Option<ProviderError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(ProviderError::Unauthorized(what.to_string())),
        404 => Some(ProviderError::NotFound(what.to_string())),
        429 => Some(ProviderError::RateLimited),
        status => Some(ProviderError::Status(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::Status(502).is_retryable());
        assert!(!ProviderError::Status(400).is_retryable());
        assert!(!ProviderError::Unauthorized("repo".to_string()).is_retryable());
        assert!(!ProviderError::NotFound("repo".to_string()).is_retryable());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(status_error(200, "x").is_none());
        assert!(matches!(status_error(401, "x"), Some(ProviderError::Unauthorized(_))));
        assert!(matches!(status_error(404, "x"), Some(ProviderError::NotFound(_))));
        assert!(matches!(status_error(429, "x"), Some(ProviderError::RateLimited)));
        assert!(matches!(status_error(503, "x"), Some(ProviderError::Status(503))));
    }

    #[test]
    fn test_tree_entry_serialization() {
        let entry = TreeEntry::blob("src/app/page.tsx", "abc", 12);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"blob\""));
    }
}
