//! Graph assembly: screens, flows and call edges into one analysis record.
//!
//! Assembly is pure. Given the same analyzed files it produces the same
//! record (apart from the timestamp), which is what makes re-analysis of an
//! unchanged commit stable.

pub mod ids;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::flows::{link_closure, screen_closure, ClosureLimits, FileAnalysis};
use crate::model::{
    AnalysisRecord, CodeFlow, Coverage, DanglingReference, FrameworkDetection, Screen,
    ScreenshotStatus,
};
use crate::screens::{resolve_targets, ScreenCandidate};

/// Inputs to [`assemble`].
pub struct GraphInput<'a> {
    pub repo: &'a str,
    pub branch: &'a str,
    pub commit_sha: &'a str,
    pub timestamp: DateTime<Utc>,
    pub framework: FrameworkDetection,
    pub screens: &'a [ScreenCandidate],
    pub analyzed: &'a BTreeMap<String, FileAnalysis>,
    pub limits: ClosureLimits,
    /// Scan-wide coverage gathered before assembly.
    pub coverage: Coverage,
}

/// Build the analysis record for one scan.
pub fn assemble(input: GraphInput<'_>) -> AnalysisRecord {
    let GraphInput {
        repo,
        branch,
        commit_sha,
        timestamp,
        framework,
        screens: candidates,
        analyzed,
        limits,
        mut coverage,
    } = input;

    let routes: Vec<&str> = candidates.iter().map(|c| c.route_path.as_str()).collect();
    let tag = framework.tag();
    let mut flows: BTreeMap<String, CodeFlow> = BTreeMap::new();
    let mut owned: Vec<BTreeSet<String>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let closure = screen_closure(&candidate.source_file, analyzed, limits);
        for (limit, value) in &closure.truncations {
            coverage.add_truncation(*limit, *value, &candidate.source_file);
        }
        let files: Vec<&FileAnalysis> = closure
            .files
            .iter()
            .filter_map(|path| analyzed.get(path))
            .collect();
        let edges = link_closure(&files);

        for file in &files {
            for (draft, id) in file.drafts.iter().zip(&file.flow_ids) {
                let flow = flows.entry(id.clone()).or_insert_with(|| CodeFlow {
                    id: id.clone(),
                    kind: draft.kind,
                    name: draft.name.clone(),
                    source_file: file.path.clone(),
                    line: draft.line,
                    snippet: draft.snippet.clone(),
                    calls: BTreeSet::new(),
                });
                if let Some(calls) = edges.get(id) {
                    flow.calls.extend(calls.iter().cloned());
                }
            }
        }

        let roots: Vec<&String> = analyzed
            .get(&candidate.source_file)
            .map(|f| f.flow_ids.iter().collect())
            .unwrap_or_default();
        owned.push(reach(roots, &edges));
    }

    let mut flows: Vec<CodeFlow> = flows.into_values().collect();
    flows.sort_by(|a, b| {
        (a.source_file.as_str(), a.line, a.id.as_str()).cmp(&(b.source_file.as_str(), b.line, b.id.as_str()))
    });
    let position: HashMap<&str, usize> = flows
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.as_str(), i))
        .collect();

    let mut screens: Vec<Screen> = candidates
        .iter()
        .zip(owned)
        .map(|(candidate, owned)| {
            let file = analyzed.get(&candidate.source_file);
            let mut flow_ids: Vec<String> = owned.into_iter().collect();
            flow_ids.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));
            Screen {
                id: ids::screen_id(&candidate.source_file, &candidate.route_path),
                name: candidate.name.clone(),
                route_path: candidate.route_path.clone(),
                source_file: candidate.source_file.clone(),
                source_hash: file.map(|f| f.content_hash.clone()).unwrap_or_default(),
                kind: candidate.kind,
                flow_ids,
                navigates_to: file
                    .map(|f| resolve_targets(&f.navigation, &routes, &candidate.route_path))
                    .unwrap_or_default(),
                framework: tag.to_string(),
                last_analyzed_commit: commit_sha.to_string(),
                screenshot_status: ScreenshotStatus::None,
                screenshot_url: None,
                last_screenshot_commit: None,
                screenshot_fingerprint: None,
                screenshot_error: None,
            }
        })
        .collect();
    screens.sort_by(|a, b| {
        (a.route_path.as_str(), a.source_file.as_str()).cmp(&(b.route_path.as_str(), b.source_file.as_str()))
    });

    let mut record = AnalysisRecord {
        analysis_id: ids::analysis_id(repo, branch, commit_sha),
        repo: repo.to_string(),
        branch: branch.to_string(),
        commit_sha: commit_sha.to_string(),
        timestamp,
        flows_count: flows.len(),
        files_analyzed: analyzed.len(),
        screens,
        flows,
        framework,
        coverage,
    };
    repair(&mut record);
    record
}

/// Flows reachable from `roots` along `edges`, roots included.
fn reach(roots: Vec<&String>, edges: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<&String> = roots;
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(next) = edges.get(id) {
            stack.extend(next.iter().filter(|n| !seen.contains(*n)));
        }
    }
    seen
}

/// Drop references to flows that do not exist, recording each drop in the
/// coverage. Returns the number of references dropped.
pub fn repair(record: &mut AnalysisRecord) -> usize {
    let known: HashSet<String> = record.flows.iter().map(|f| f.id.clone()).collect();
    let mut dropped = Vec::new();

    for screen in &mut record.screens {
        let mut seen = HashSet::new();
        screen.flow_ids.retain(|id| {
            if !known.contains(id) {
                dropped.push(DanglingReference {
                    owner: screen.id.clone(),
                    missing: id.clone(),
                });
                return false;
            }
            seen.insert(id.clone())
        });
    }
    for flow in &mut record.flows {
        let owner = flow.id.clone();
        flow.calls.retain(|id| {
            let keep = known.contains(id);
            if !keep {
                dropped.push(DanglingReference {
                    owner: owner.clone(),
                    missing: id.clone(),
                });
            }
            keep
        });
    }

    let count = dropped.len();
    if count > 0 {
        tracing::warn!(
            analysis_id = %record.analysis_id,
            dropped = count,
            "dropped dangling flow references"
        );
        record.coverage.dangling_dropped.extend(dropped);
    }
    record.flows_count = record.flows.len();
    count
}

/// Every flow reachable from `start` through `calls`, including `start`.
pub fn reachable_flows(record: &AnalysisRecord, start: &str) -> BTreeSet<String> {
    let calls: HashMap<&str, &BTreeSet<String>> = record
        .flows
        .iter()
        .map(|f| (f.id.as_str(), &f.calls))
        .collect();
    let mut seen = BTreeSet::new();
    if !calls.contains_key(start) {
        return seen;
    }
    let mut stack = vec![start.to_string()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(next) = calls.get(id.as_str()) {
            stack.extend(next.iter().filter(|n| !seen.contains(*n)).cloned());
        }
    }
    seen
}
