//! Deterministic identifiers.
//!
//! Ids are pure functions of normalized inputs: re-analysing unchanged source
//! must produce byte-identical ids, so no counters or random values here.

use sha2::{Digest, Sha256};

use crate::model::FlowKind;
use crate::paths;

const ID_HEX_LEN: usize = 16;

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..ID_HEX_LEN].to_string()
}

/// Screen id from source path and route path.
pub fn screen_id(source_file: &str, route_path: &str) -> String {
    let input = format!("{}#{}", paths::normalize(source_file), route_path);
    format!("screen_{}", short_hash(&input))
}

/// Flow id from source path, kind, name and the occurrence index of that
/// (path, kind, name) triple within the file.
pub fn flow_id(source_file: &str, kind: FlowKind, name: &str, ordinal: usize) -> String {
    let input = format!(
        "{}|{}|{}|{}",
        paths::normalize(source_file),
        kind.as_str(),
        name,
        ordinal
    );
    format!("flow_{}", short_hash(&input))
}

/// Analysis id for one (repo, branch, commit) snapshot.
pub fn analysis_id(repo: &str, branch: &str, commit_sha: &str) -> String {
    let input = format!("{}\n{}\n{}", repo, branch, commit_sha);
    format!("analysis_{}", short_hash(&input))
}

/// Fingerprint of what a screenshot depends on.
pub fn screenshot_fingerprint(source_hash: &str, route_path: &str) -> String {
    short_hash(&format!("{}@{}", source_hash, route_path))
}

/// Full SHA-256 hex digest of file content, used by providers without
/// their own content hashes.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        assert_eq!(screen_id("pages/index.tsx", "/"), screen_id("./pages/index.tsx", "/"));
        assert_ne!(screen_id("pages/index.tsx", "/"), screen_id("pages/index.tsx", "/home"));
        assert!(screen_id("a", "/").starts_with("screen_"));
        assert_eq!(screen_id("a", "/").len(), "screen_".len() + 16);
    }

    #[test]
    fn test_flow_id_discriminator() {
        let a = flow_id("src/api.ts", FlowKind::ApiCall, "fetch", 0);
        let b = flow_id("src/api.ts", FlowKind::ApiCall, "fetch", 1);
        let c = flow_id("src/api.ts", FlowKind::FunctionCall, "fetch", 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, flow_id("src/api.ts", FlowKind::ApiCall, "fetch", 0));
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
