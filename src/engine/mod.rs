//! The analysis engine: the public entry point tying providers, extraction,
//! assembly, persistence and screenshot capture together.
//!
//! Collaborators are injected at construction; the engine owns no global
//! state. Concurrent `analyze` calls for the same (repo, branch, commit)
//! share one scan.

mod scan;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use globset::GlobSet;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{self, Config};
use crate::model::{
    AnalysisRecord, AnalysisResult, CaptureResponse, CaptureStatus, ScreenRef, ScreenshotResult,
};
use crate::provider::{with_retry, CaptureProvider, ProviderError, TreeProvider};
use crate::screenshot::{fold_results, plan_captures, run_captures, CaptureTarget};
use crate::store::{load_by_id, load_record, save_record, RecordStore, StoreError};

/// Errors returned by engine operations.
///
/// `Clone` so one single-flight result can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("external dependency failed: {0}")]
    ExternalDependency(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl EngineError {
    /// Map a provider failure. Without a token, a missing repository is
    /// indistinguishable from a private one, so it is reported as an
    /// authorization problem.
    pub(crate) fn from_provider(e: ProviderError, has_token: bool) -> Self {
        match e {
            ProviderError::Unauthorized(what) => EngineError::Authorization(what),
            ProviderError::NotFound(what) if !has_token => EngineError::Authorization(format!(
                "{} not found; private repositories need an access token",
                what
            )),
            ProviderError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::ExternalDependency(other.to_string()),
        }
    }
}

pub fn validate_repo(repo: &str) -> Result<(), EngineError> {
    if repo.trim().is_empty() {
        return Err(EngineError::Validation("repo must not be empty".to_string()));
    }
    if repo.chars().any(char::is_whitespace) {
        return Err(EngineError::Validation(format!("repo must not contain whitespace: {:?}", repo)));
    }
    Ok(())
}

pub fn validate_branch(branch: &str) -> Result<(), EngineError> {
    if branch.trim().is_empty() {
        return Err(EngineError::Validation("branch must not be empty".to_string()));
    }
    Ok(())
}

pub fn validate_base_url(base_url: &str) -> Result<(), EngineError> {
    if base_url.trim().is_empty() {
        return Err(EngineError::Validation("baseUrl must not be empty".to_string()));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(EngineError::Validation(format!(
            "baseUrl must be an http(s) url: {:?}",
            base_url
        )));
    }
    Ok(())
}

pub fn validate_screens(screens: &[ScreenRef]) -> Result<(), EngineError> {
    if screens.is_empty() {
        return Err(EngineError::Validation("screens must not be empty".to_string()));
    }
    if let Some(blank) = screens.iter().find(|s| s.id.trim().is_empty()) {
        return Err(EngineError::Validation(format!("screen without id: {:?}", blank.name)));
    }
    Ok(())
}

type ScanFuture = Shared<BoxFuture<'static, Result<Arc<AnalysisRecord>, EngineError>>>;

pub(crate) struct Inner {
    pub(crate) trees: Arc<dyn TreeProvider>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) capture: Option<Arc<dyn CaptureProvider>>,
    pub(crate) config: Config,
    pub(crate) excluded: GlobSet,
    /// Serializes load-modify-save of stored records.
    pub(crate) record_writes: Mutex<()>,
    inflight: Mutex<HashMap<String, ScanFuture>>,
}

/// Repository scan and screenshot engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(
        trees: Arc<dyn TreeProvider>,
        store: Arc<dyn RecordStore>,
        capture: Option<Arc<dyn CaptureProvider>>,
        config: Config,
    ) -> Result<Self, EngineError> {
        config::validate(&config).map_err(|e| EngineError::Validation(e.to_string()))?;
        let excluded = config
            .excluded_matcher()
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(Inner {
                trees,
                store,
                capture,
                config,
                excluded,
                record_writes: Mutex::new(()),
                inflight: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Analyze `repo` at the head of `branch`.
    ///
    /// Returns the stored record unchanged when the branch still points at
    /// the commit it was last analyzed at.
    pub async fn analyze(
        &self,
        repo: &str,
        branch: &str,
        access_token: Option<&str>,
    ) -> Result<AnalysisResult, EngineError> {
        validate_repo(repo)?;
        validate_branch(branch)?;
        let inner = &self.inner;

        let policy = inner.config.fetch_policy();
        let (commit, _) = with_retry(&policy, "resolve_commit", move || {
            inner.trees.resolve_commit(repo, branch, access_token)
        })
        .await;
        let commit = commit.map_err(|e| EngineError::from_provider(e, access_token.is_some()))?;

        let previous = load_record(inner.store.as_ref(), &AnalysisRecord::store_key(repo, branch)).await?;
        if let Some(previous) = &previous {
            if previous.commit_sha == commit {
                tracing::info!(repo, branch, commit = %commit, "commit already analyzed");
                return Ok(previous.to_result());
            }
        }

        let flight_key = format!("{}\n{}\n{}", repo, branch, commit);
        let scan = {
            let mut inflight = inner.inflight.lock().await;
            match inflight.get(&flight_key).cloned() {
                Some(running) => {
                    tracing::debug!(repo, branch, commit = %commit, "joining in-flight scan");
                    running
                }
                None => {
                    let request = scan::ScanRequest {
                        repo: repo.to_string(),
                        branch: branch.to_string(),
                        commit: commit.clone(),
                        token: access_token.map(str::to_string),
                    };
                    let owner = Arc::clone(inner);
                    let key = flight_key.clone();
                    let future = async move {
                        let result = scan::run(&owner, request).await.map(Arc::new);
                        owner.inflight.lock().await.remove(&key);
                        result
                    }
                    .boxed()
                    .shared();
                    inflight.insert(flight_key, future.clone());
                    future
                }
            }
        };

        let record = scan.await?;
        Ok(record.to_result())
    }

    /// Load a stored record by analysis id.
    pub async fn get_analysis(&self, analysis_id: &str) -> Result<AnalysisRecord, EngineError> {
        if analysis_id.trim().is_empty() {
            return Err(EngineError::Validation("analysisId must not be empty".to_string()));
        }
        load_by_id(self.inner.store.as_ref(), analysis_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("analysis {}", analysis_id)))
    }

    /// Capture screenshots for `screens` of the analysis `project_id`.
    ///
    /// Individual capture failures are reported in the response, never as
    /// an error.
    pub async fn capture_screenshots(
        &self,
        project_id: &str,
        base_url: &str,
        screens: &[ScreenRef],
        force: bool,
    ) -> Result<CaptureResponse, EngineError> {
        validate_base_url(base_url)?;
        validate_screens(screens)?;
        let inner = &self.inner;
        let provider = inner
            .capture
            .as_ref()
            .ok_or_else(|| EngineError::ExternalDependency("no capture provider configured".to_string()))?;

        let record = self.get_analysis(project_id).await?;
        let plan = plan_captures(&record, screens, force);
        tracing::info!(
            analysis_id = %record.analysis_id,
            selected = plan.selected.len(),
            skipped = plan.skipped,
            rejected = plan.rejected.len(),
            "capture planned"
        );

        let mut results = plan.rejected.clone();
        if !plan.selected.is_empty() {
            if !self.mark_pending(&record, &plan.selected).await? {
                tracing::warn!(
                    analysis_id = %record.analysis_id,
                    "record moved to a newer commit; pending state not written"
                );
            }

            let settings = inner.config.capture_settings();
            let captured = run_captures(provider.as_ref(), base_url, &plan.selected, &settings).await;

            if !self.fold_into_latest(&record, &captured).await? {
                tracing::warn!(
                    analysis_id = %record.analysis_id,
                    "record moved to a newer commit; capture results not persisted"
                );
            }
            results.extend(captured);
        }

        // Report in request order.
        let order: HashMap<&str, usize> = screens
            .iter()
            .enumerate()
            .rev()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();
        results.sort_by_key(|r| order.get(r.screen_id.as_str()).copied().unwrap_or(usize::MAX));

        Ok(CaptureResponse {
            captured: results.iter().filter(|r| r.status == CaptureStatus::Ok).count(),
            total: results.len(),
            skipped: plan.skipped,
            results,
        })
    }

    /// Mark `targets` pending in the stored record, provided it is still at
    /// `record`'s commit. Returns whether anything was written.
    async fn mark_pending(&self, record: &AnalysisRecord, targets: &[CaptureTarget]) -> Result<bool, EngineError> {
        let inner = &self.inner;
        let _guard = inner.record_writes.lock().await;
        let Some(mut latest) = load_record(inner.store.as_ref(), &record.key()).await? else {
            return Ok(false);
        };
        if latest.commit_sha != record.commit_sha {
            return Ok(false);
        }
        for target in targets {
            if let Some(screen) = latest.screen_mut(&target.screen_id) {
                screen.mark_pending();
            }
        }
        save_record(inner.store.as_ref(), &latest).await?;
        Ok(true)
    }

    /// Fold capture results into the latest stored record when it is still
    /// at `record`'s commit. Returns whether the results were persisted.
    async fn fold_into_latest(
        &self,
        record: &AnalysisRecord,
        captured: &[ScreenshotResult],
    ) -> Result<bool, EngineError> {
        let inner = &self.inner;
        let _guard = inner.record_writes.lock().await;
        let Some(mut latest) = load_record(inner.store.as_ref(), &record.key()).await? else {
            return Ok(false);
        };
        if !fold_results(&mut latest, &record.commit_sha, captured) {
            return Ok(false);
        }
        save_record(inner.store.as_ref(), &latest).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        let e = EngineError::from_provider(ProviderError::NotFound("acme/private".to_string()), false);
        assert!(matches!(e, EngineError::Authorization(_)));
        let e = EngineError::from_provider(ProviderError::NotFound("acme/gone".to_string()), true);
        assert!(matches!(e, EngineError::NotFound(_)));
        let e = EngineError::from_provider(ProviderError::Unauthorized("bad token".to_string()), true);
        assert!(matches!(e, EngineError::Authorization(_)));
        let e = EngineError::from_provider(ProviderError::Status(502), true);
        assert!(matches!(e, EngineError::ExternalDependency(_)));
    }

    #[test]
    fn test_validation() {
        assert!(validate_repo("acme/shop").is_ok());
        assert!(validate_repo("").is_err());
        assert!(validate_repo("acme shop").is_err());
        assert!(validate_branch(" ").is_err());
        assert!(validate_base_url("https://preview.app").is_ok());
        assert!(validate_base_url("preview.app").is_err());
        assert!(validate_screens(&[]).is_err());
    }
}
