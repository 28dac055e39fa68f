//! Which screens need a new capture.

use std::collections::HashSet;

use crate::graph::ids;
use crate::model::{
    AnalysisRecord, CaptureStatus, Screen, ScreenRef, ScreenshotResult, ScreenshotStatus,
};

/// Copy screenshot state from the record being superseded. Screens match by
/// id, or by source file when the route changed.
pub fn carry_forward(record: &mut AnalysisRecord, previous: &AnalysisRecord) {
    let mut inherited = 0;
    for screen in &mut record.screens {
        let prior = previous
            .screen(&screen.id)
            .or_else(|| previous.screens.iter().find(|p| p.source_file == screen.source_file));
        if let Some(prior) = prior {
            screen.inherit_screenshot(prior);
            inherited += 1;
        }
    }
    tracing::debug!(
        analysis_id = %record.analysis_id,
        previous = %previous.analysis_id,
        inherited,
        "carried screenshot state forward"
    );
}

/// Whether `screen` needs a new capture at `commit`.
///
/// Any status other than `Ok` (including `Error`) is always recaptured,
/// even when the screen's fingerprint and commit are unchanged.
pub fn needs_capture(screen: &Screen, commit: &str, force: bool) -> bool {
    if force || screen.screenshot_status != ScreenshotStatus::Ok {
        return true;
    }
    if screen.last_screenshot_commit.as_deref() == Some(commit) {
        return false;
    }
    let current = ids::screenshot_fingerprint(&screen.source_hash, &screen.route_path);
    screen.screenshot_fingerprint.as_deref() != Some(current.as_str())
}

/// A screen selected for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub screen_id: String,
    pub path: String,
}

/// Outcome of planning a capture request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturePlan {
    pub selected: Vec<CaptureTarget>,
    /// Requested screens that are up to date.
    pub skipped: usize,
    /// Requests refused before any provider call.
    pub rejected: Vec<ScreenshotResult>,
}

fn rejection(screen_id: &str, error: String) -> ScreenshotResult {
    ScreenshotResult {
        screen_id: screen_id.to_string(),
        status: CaptureStatus::Error,
        url: None,
        error: Some(error),
        attempts: 0,
    }
}

/// Plan captures for `requested` screens of `record`.
pub fn plan_captures(record: &AnalysisRecord, requested: &[ScreenRef], force: bool) -> CapturePlan {
    let mut plan = CapturePlan::default();
    let mut seen = HashSet::new();

    for request in requested {
        if !seen.insert(request.id.as_str()) {
            continue;
        }
        let Some(screen) = record.screen(&request.id) else {
            plan.rejected
                .push(rejection(&request.id, format!("unknown screen {}", request.id)));
            continue;
        };
        if !request.path.starts_with('/') {
            plan.rejected.push(rejection(
                &request.id,
                format!("screen path must start with '/': {:?}", request.path),
            ));
            continue;
        }
        if !needs_capture(screen, &record.commit_sha, force) {
            plan.skipped += 1;
            continue;
        }
        plan.selected.push(CaptureTarget {
            screen_id: screen.id.clone(),
            path: request.path.clone(),
        });
    }

    plan
}

/// Fold capture results into `record`. Returns false, leaving the record
/// untouched, when the record has moved to another commit.
pub fn fold_results(record: &mut AnalysisRecord, commit: &str, results: &[ScreenshotResult]) -> bool {
    if record.commit_sha != commit {
        return false;
    }
    for result in results {
        let Some(screen) = record.screen_mut(&result.screen_id) else {
            continue;
        };
        match (result.status, &result.url) {
            (CaptureStatus::Ok, Some(url)) => {
                let fingerprint = ids::screenshot_fingerprint(&screen.source_hash, &screen.route_path);
                screen.record_capture(url.clone(), commit, fingerprint);
            }
            (CaptureStatus::Ok, None) => {
                screen.record_failure("capture reported ok without a url".to_string());
            }
            (CaptureStatus::Error, _) => {
                let error = result.error.clone().unwrap_or_else(|| "capture failed".to_string());
                screen.record_failure(error);
            }
        }
    }
    true
}
