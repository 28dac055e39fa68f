//! Flow extraction: classify call sites per file, resolve imports, walk each
//! screen's bounded import closure and link flows into a call graph.

mod classify;
mod imports;
mod link;

pub use classify::{classify_file, find_invocations, FlowDraft, Invocation};
pub use imports::resolve_import;
pub use link::link_closure;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analysis::{analyze_source, is_source_file, SourceFacts};
use crate::graph::ids;
use crate::model::LimitKind;
use crate::screens;

/// Everything the engine needs from one fetched file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub path: String,
    pub content_hash: String,
    pub facts: SourceFacts,
    pub drafts: Vec<FlowDraft>,
    /// Flow id per draft, same order.
    pub flow_ids: Vec<String>,
    pub invocations: Vec<Invocation>,
    /// Resolved import targets in specifier order.
    pub imports: Vec<String>,
    /// Raw navigation targets found in the source.
    pub navigation: BTreeSet<String>,
}

/// Analyze one file against the repository tree.
pub fn analyze_file(path: &str, source: &str, tree: &BTreeSet<String>) -> FileAnalysis {
    let facts = analyze_source(path, source);
    let drafts = classify_file(&facts, source);
    let invocations = find_invocations(&facts, source);

    let mut ordinals: HashMap<(crate::model::FlowKind, &str), usize> = HashMap::new();
    let flow_ids = drafts
        .iter()
        .map(|d| {
            let ordinal = ordinals.entry((d.kind, d.name.as_str())).or_insert(0);
            let id = ids::flow_id(path, d.kind, &d.name, *ordinal);
            *ordinal += 1;
            id
        })
        .collect();

    let mut imports: Vec<String> = Vec::new();
    for import in &facts.imports {
        if let Some(target) = resolve_import(&import.specifier, path, tree) {
            if target != path && !imports.contains(&target) {
                imports.push(target);
            }
        }
    }

    FileAnalysis {
        path: path.to_string(),
        content_hash: ids::content_hash(source.as_bytes()),
        navigation: screens::extract_targets(source),
        facts,
        drafts,
        flow_ids,
        invocations,
        imports,
    }
}

/// Ceilings for a single screen's closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureLimits {
    pub max_import_depth: usize,
    pub max_files_per_screen: usize,
}

/// The files reachable from a screen, and which ceilings stopped the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Sorted by path.
    pub files: Vec<String>,
    pub truncations: Vec<(LimitKind, usize)>,
}

/// Breadth-first walk of resolved imports from `entry` over the analyzed
/// files. Files that were not analyzed (skipped or over the scan-wide cap)
/// are left out without a truncation of their own.
pub fn screen_closure(
    entry: &str,
    analyzed: &BTreeMap<String, FileAnalysis>,
    limits: ClosureLimits,
) -> Closure {
    let mut closure = Closure::default();
    if !analyzed.contains_key(entry) {
        return closure;
    }

    let mut visited: BTreeSet<String> = BTreeSet::from([entry.to_string()]);
    let mut frontier = vec![entry.to_string()];
    let mut depth = 0;
    let (mut depth_hit, mut files_hit) = (false, false);

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for path in &frontier {
            let Some(file) = analyzed.get(path) else {
                continue;
            };
            for dep in &file.imports {
                if visited.contains(dep) {
                    continue;
                }
                if depth >= limits.max_import_depth {
                    depth_hit |= is_source_file(dep);
                    continue;
                }
                if !analyzed.contains_key(dep) {
                    continue;
                }
                if visited.len() >= limits.max_files_per_screen {
                    files_hit = true;
                    continue;
                }
                visited.insert(dep.clone());
                next.push(dep.clone());
            }
        }
        frontier = next;
        depth += 1;
    }

    if depth_hit {
        closure
            .truncations
            .push((LimitKind::ImportDepth, limits.max_import_depth));
    }
    if files_hit {
        closure
            .truncations
            .push((LimitKind::FilesPerScreen, limits.max_files_per_screen));
    }
    closure.files = visited.into_iter().collect();
    closure
}
