//! One full scan of a repository snapshot.
//!
//! list tree -> detect framework -> discover screens -> fetch and analyze
//! files level by level along imports -> assemble -> carry screenshot state
//! forward -> save.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;

use super::{EngineError, Inner};
use crate::analysis::is_source_file;
use crate::detect::detect_framework;
use crate::flows::{analyze_file, FileAnalysis};
use crate::graph::{assemble, GraphInput};
use crate::model::{AnalysisRecord, Coverage, LimitKind};
use crate::paths;
use crate::provider::{with_retry, ProviderError, TreeEntry};
use crate::screens::discover_screens;
use crate::screenshot::carry_forward;
use crate::store::{load_record, save_record};

/// Scope used for scan-wide truncations.
const SCAN_SCOPE: &str = "*";

pub(crate) struct ScanRequest {
    pub repo: String,
    pub branch: String,
    pub commit: String,
    pub token: Option<String>,
}

/// Blob paths of the listing that survive normalization, the ignore list
/// and `excluded_paths`, with their sizes.
fn usable_blobs(inner: &Inner, entries: &[TreeEntry]) -> BTreeMap<String, u64> {
    entries
        .iter()
        .filter(|e| e.is_blob())
        .map(|e| (paths::normalize(&e.path), e.size))
        .filter(|(path, _)| !path.is_empty() && !paths::is_ignored(path))
        .filter(|(path, _)| !inner.excluded.is_match(path))
        .collect()
}

pub(crate) async fn run(inner: &Inner, request: ScanRequest) -> Result<AnalysisRecord, EngineError> {
    let ScanRequest {
        repo,
        branch,
        commit,
        token,
    } = request;
    let token = token.as_deref();
    let started = std::time::Instant::now();
    tracing::info!(repo = %repo, branch = %branch, commit = %commit, "scan started");

    let policy = inner.config.fetch_policy();
    let (repo_ref, commit_ref) = (repo.as_str(), commit.as_str());
    let (listing, _) = with_retry(&policy, "list_tree", move || {
        inner.trees.list_tree(repo_ref, commit_ref, token)
    })
    .await;
    let listing = listing.map_err(|e| EngineError::from_provider(e, token.is_some()))?;

    let blobs = usable_blobs(inner, &listing);
    let all_paths: Vec<&str> = blobs.keys().map(String::as_str).collect();
    let framework = detect_framework(&all_paths);
    let screens = discover_screens(framework.primary, &all_paths);
    tracing::debug!(
        entries = listing.len(),
        usable = blobs.len(),
        framework = framework.tag(),
        screens = screens.len(),
        "tree classified"
    );

    let tree: Arc<BTreeSet<String>> = Arc::new(blobs.keys().cloned().collect());
    let mut coverage = Coverage::default();
    let mut analyzed: BTreeMap<String, FileAnalysis> = BTreeMap::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut fetched = 0usize;
    let limits = &inner.config.limits;

    let mut level: Vec<String> = screens.iter().map(|s| s.source_file.clone()).collect();
    level.sort();
    level.dedup();

    for depth in 0..=limits.max_import_depth {
        level.retain(|path| visited.insert(path.clone()));
        if level.is_empty() {
            break;
        }

        let mut fetchable = Vec::with_capacity(level.len());
        for path in level.drain(..) {
            let size = blobs.get(&path).copied().unwrap_or(0);
            if size > limits.max_file_bytes {
                coverage.add_skipped(&path, format!("{} bytes exceeds max_file_bytes", size));
                coverage.add_truncation(LimitKind::FileSize, limits.max_file_bytes as usize, &path);
                continue;
            }
            fetchable.push(path);
        }

        let budget = limits.max_files.saturating_sub(fetched);
        if fetchable.len() > budget {
            tracing::warn!(depth, dropped = fetchable.len() - budget, "scan-wide file ceiling reached");
            fetchable.truncate(budget);
            coverage.add_truncation(LimitKind::TotalFiles, limits.max_files, SCAN_SCOPE);
        }

        fetched += fetchable.len();
        let sources = fetch_level(inner, &repo, &commit, token, &fetchable, &mut coverage).await?;

        let tree_ref = Arc::clone(&tree);
        let results: Vec<FileAnalysis> = tokio::task::spawn_blocking(move || {
            sources
                .into_par_iter()
                .map(|(path, source)| analyze_file(&path, &source, &tree_ref))
                .collect()
        })
        .await
        .map_err(|e| EngineError::ExternalDependency(format!("analysis worker failed: {}", e)))?;

        let mut next: BTreeSet<String> = BTreeSet::new();
        for file in results {
            next.extend(
                file.imports
                    .iter()
                    .filter(|dep| is_source_file(dep) && !visited.contains(*dep))
                    .cloned(),
            );
            analyzed.insert(file.path.clone(), file);
        }
        level = next.into_iter().collect();
    }

    let mut record = assemble(GraphInput {
        repo: &repo,
        branch: &branch,
        commit_sha: &commit,
        timestamp: Utc::now(),
        framework,
        screens: &screens,
        analyzed: &analyzed,
        limits: inner.config.closure_limits(),
        coverage,
    });

    {
        // Screenshot state may have changed while this scan ran, so carry
        // forward from the record as stored now.
        let _guard = inner.record_writes.lock().await;
        if let Some(previous) = load_record(inner.store.as_ref(), &record.key()).await? {
            carry_forward(&mut record, &previous);
        }
        save_record(inner.store.as_ref(), &record).await?;
    }

    tracing::info!(
        analysis_id = %record.analysis_id,
        screens = record.screens.len(),
        flows = record.flows_count,
        files = record.files_analyzed,
        skipped = record.coverage.files_skipped.len(),
        truncated = record.coverage.truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scan finished"
    );
    Ok(record)
}

/// Fetch one BFS level concurrently. Failed or undecodable files are
/// recorded as skipped; an authorization failure aborts the scan.
async fn fetch_level(
    inner: &Inner,
    repo: &str,
    commit: &str,
    token: Option<&str>,
    paths: &[String],
    coverage: &mut Coverage,
) -> Result<Vec<(String, String)>, EngineError> {
    let policy = inner.config.fetch_policy();
    let policy = &policy;
    let fetches: Vec<BoxFuture<'_, (&str, Result<Vec<u8>, ProviderError>)>> = paths
        .iter()
        .map(|path| {
            let path = path.as_str();
            async move {
                let (result, _) = with_retry(policy, "get_content", move || {
                    inner.trees.get_content(repo, commit, path, token)
                })
                .await;
                (path, result)
            }
            .boxed()
        })
        .collect();
    let fetched: Vec<(&str, Result<Vec<u8>, ProviderError>)> = stream::iter(fetches)
        .buffer_unordered(inner.config.fetch.concurrency)
        .collect()
        .await;

    let mut sources = Vec::with_capacity(fetched.len());
    for (path, result) in fetched {
        match result {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(source) => sources.push((path.to_string(), source)),
                Err(_) => coverage.add_skipped(path, "content is not valid UTF-8"),
            },
            Err(ProviderError::Unauthorized(what)) => {
                return Err(EngineError::Authorization(what));
            }
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "content fetch failed");
                coverage.add_skipped(path, e.to_string());
            }
        }
    }
    // buffer_unordered completes in any order.
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    coverage.files_skipped.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}
