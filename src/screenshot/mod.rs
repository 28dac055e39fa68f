//! Incremental screenshot orchestration.
//!
//! Planning decides which screens need a capture; `run_captures` drives the
//! capture provider with bounded concurrency and per-request retry. Folding
//! results back into the stored record is left to the engine, which owns
//! the store.

mod plan;

pub use plan::{carry_forward, fold_results, needs_capture, plan_captures, CapturePlan, CaptureTarget};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};

use crate::model::{CaptureStatus, ScreenshotResult};
use crate::provider::{with_retry, CaptureProvider, ProviderError, RetryPolicy};

/// Concurrency and retry settings for a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Page url for a screen path under `base_url`.
pub fn screen_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Capture every target. Never fails: each failure becomes an `error`
/// result. Results come back in target order.
pub async fn run_captures(
    provider: &dyn CaptureProvider,
    base_url: &str,
    targets: &[CaptureTarget],
    settings: &CaptureSettings,
) -> Vec<ScreenshotResult> {
    let captures: Vec<BoxFuture<'_, (usize, ScreenshotResult)>> = targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            async move { (index, capture_one(provider, base_url, target, &settings.retry).await) }
                .boxed()
        })
        .collect();
    let mut results: Vec<(usize, ScreenshotResult)> = stream::iter(captures)
        .buffer_unordered(settings.max_in_flight.max(1))
        .collect()
        .await;
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

async fn capture_one(
    provider: &dyn CaptureProvider,
    base_url: &str,
    target: &CaptureTarget,
    retry: &RetryPolicy,
) -> ScreenshotResult {
    let page = screen_url(base_url, &target.path);
    let (url, path) = (page.as_str(), target.path.as_str());
    let (outcome, attempts) = with_retry(retry, "capture", move || async move {
        let outcome = provider.capture(url, path).await?;
        match outcome.status {
            CaptureStatus::Ok => Ok(outcome),
            CaptureStatus::Error => Err(ProviderError::Rejected(
                outcome.error.unwrap_or_else(|| "capture failed".to_string()),
            )),
        }
    })
    .await;

    match outcome {
        Ok(outcome) => {
            tracing::debug!(screen_id = %target.screen_id, attempts, "screen captured");
            ScreenshotResult {
                screen_id: target.screen_id.clone(),
                status: CaptureStatus::Ok,
                url: outcome.url,
                error: None,
                attempts,
            }
        }
        Err(e) => {
            tracing::warn!(screen_id = %target.screen_id, attempts, error = %e, "screen capture failed");
            ScreenshotResult {
                screen_id: target.screen_id.clone(),
                status: CaptureStatus::Error,
                url: None,
                error: Some(e.to_string()),
                attempts,
            }
        }
    }
}
