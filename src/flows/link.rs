//! Call-graph linking within one screen's import closure.
//!
//! Edges come from three sources: call sites owned by the innermost
//! enclosing function, invocations of known function names, and ui-event
//! handler bindings. Names resolve in the caller's file first, then in the
//! closure in path order.

use std::collections::{BTreeMap, BTreeSet};

use super::FileAnalysis;
use crate::model::FlowKind;

/// (closure file index, draft index).
type FlowKey = (usize, usize);

struct Linker<'a> {
    files: &'a [&'a FileAnalysis],
}

impl<'a> Linker<'a> {
    fn function_draft(&self, file: usize, definition: usize) -> Option<usize> {
        self.files[file]
            .drafts
            .iter()
            .position(|d| d.definition == Some(definition))
    }

    /// The function flow owning `line`, if any.
    fn owner(&self, file: usize, line: usize) -> Option<FlowKey> {
        let definition = self.files[file].facts.enclosing_function(line)?;
        self.function_draft(file, definition).map(|d| (file, d))
    }

    fn find_in(&self, file: usize, name: &str) -> Option<FlowKey> {
        self.files[file]
            .drafts
            .iter()
            .position(|d| d.kind == FlowKind::FunctionCall && d.name == name)
            .map(|d| (file, d))
    }

    /// Resolve a function name from `file`: same file, then closure order.
    fn resolve(&self, file: usize, name: &str) -> Option<FlowKey> {
        self.find_in(file, name).or_else(|| {
            (0..self.files.len())
                .filter(|other| *other != file)
                .find_map(|other| self.find_in(other, name))
        })
    }

    fn id(&self, key: FlowKey) -> &'a str {
        &self.files[key.0].flow_ids[key.1]
    }
}

/// Link the flows of a closure. Returns caller id -> callee ids.
pub fn link_closure(files: &[&FileAnalysis]) -> BTreeMap<String, BTreeSet<String>> {
    let linker = Linker { files };
    let mut edges: BTreeSet<(FlowKey, FlowKey)> = BTreeSet::new();

    for (fi, file) in files.iter().enumerate() {
        // Call sites and event bindings belong to their enclosing function.
        for (di, draft) in file.drafts.iter().enumerate() {
            if draft.kind == FlowKind::FunctionCall {
                continue;
            }
            if let Some(owner) = linker.owner(fi, draft.line) {
                edges.insert((owner, (fi, di)));
            }
        }

        for invocation in &file.invocations {
            let on_definition_line = file
                .facts
                .functions
                .iter()
                .any(|f| f.name == invocation.name && f.span.start_line == invocation.line);
            if on_definition_line {
                continue;
            }
            let (Some(owner), Some(target)) = (
                linker.owner(fi, invocation.line),
                linker.resolve(fi, &invocation.name),
            ) else {
                continue;
            };
            edges.insert((owner, target));
        }

        for (di, draft) in file.drafts.iter().enumerate() {
            if draft.kind != FlowKind::UiEvent {
                continue;
            }
            let event = (fi, di);
            if let Some(target) = draft.handler.as_deref().and_then(|h| linker.resolve(fi, h)) {
                edges.insert((event, target));
            }
            let Some(expr) = draft.expr.clone() else {
                continue;
            };
            for invocation in file.invocations.iter().filter(|i| expr.contains(&i.offset)) {
                if let Some(target) = linker.resolve(fi, &invocation.name) {
                    edges.insert((event, target));
                }
            }
            for (ci, site) in file.drafts.iter().enumerate() {
                let is_call_site = matches!(site.kind, FlowKind::ApiCall | FlowKind::DbQuery);
                if is_call_site && expr.contains(&site.offset) {
                    edges.insert((event, (fi, ci)));
                }
            }
        }
    }

    let mut linked: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (from, to) in edges {
        linked
            .entry(linker.id(from).to_string())
            .or_default()
            .insert(linker.id(to).to_string());
    }
    linked
}
