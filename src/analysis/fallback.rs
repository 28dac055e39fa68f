//! Regex-based fact extraction.
//!
//! Used when no tree-sitter grammar handles a file, when the `tree-sitter`
//! feature is disabled, or when the syntax analyzer fails. Body spans come
//! from brace matching (JS/TS) or indentation (Python).

use lazy_static::lazy_static;
use regex::Regex;

use super::{FactSource, FunctionDef, ImportRef, SourceFacts, Span};

lazy_static! {
    static ref JS_FUNCTION: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)[ \t]*(?:<[^>\n]*>)?[ \t]*\("
    )
    .unwrap();
    static ref JS_BOUND_FUNCTION: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]+)?(?:function\b|(?:\([^)]*\)|[A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=>)"
    )
    .unwrap();
    static ref JS_METHOD: Regex = Regex::new(
        r"(?m)^[ \t]+(?:(?:public|private|protected|static|async|get|set|override)[ \t]+)*([A-Za-z_$][\w$]*)[ \t]*\([^)\n]*\)[ \t]*(?::[^{;\n]+)?\{"
    )
    .unwrap();
    static ref JS_IMPORT: Regex = Regex::new(
        r#"(?m)^[ \t]*import[ \t]+(?:type[ \t]+)?(?:[^'";]*?[ \t\n]from[ \t]*)?['"]([^'"\n]+)['"]"#
    )
    .unwrap();
    static ref JS_REEXPORT: Regex = Regex::new(
        r#"(?m)^[ \t]*export[ \t]+(?:type[ \t]+)?(?:\*(?:[ \t]+as[ \t]+[\w$]+)?|\{[^}]*\})[ \t]*from[ \t]*['"]([^'"\n]+)['"]"#
    )
    .unwrap();
    static ref JS_REQUIRE: Regex =
        Regex::new(r#"\b(?:require|import)\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap();
    static ref PY_DEF: Regex =
        Regex::new(r"(?m)^([ \t]*)(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)[ \t]*\(").unwrap();
    static ref PY_FROM_IMPORT: Regex = Regex::new(
        r"(?m)^[ \t]*from[ \t]+(\.+[\w.]*|[\w.]+)[ \t]+import[ \t]+\(?([\w, \t*]+)"
    )
    .unwrap();
    static ref PY_IMPORT: Regex = Regex::new(r"(?m)^[ \t]*import[ \t]+([\w.]+)").unwrap();
}

const NOT_METHOD_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "else", "do", "try",
];

/// Maps byte offsets to 1-indexed line numbers.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

/// Extract facts for a JS-family or Python file without a parser.
pub fn extract(path: &str, language: &str, source: &str) -> SourceFacts {
    let mut facts = SourceFacts::empty(path, language, FactSource::Fallback);
    let index = LineIndex::new(source);
    if language == "python" {
        facts.functions = python_functions(source, &index);
        facts.imports = python_imports(source, &index);
    } else {
        facts.functions = js_functions(source, &index);
        facts.imports = js_imports(source, &index);
    }
    facts.normalize();
    facts
}

fn js_functions(source: &str, index: &LineIndex) -> Vec<FunctionDef> {
    let mut functions = Vec::new();
    for regex in [&*JS_FUNCTION, &*JS_BOUND_FUNCTION, &*JS_METHOD] {
        for caps in regex.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if NOT_METHOD_NAMES.contains(&name.as_str()) {
                continue;
            }
            let start_line = index.line_of(name.start());
            // Start at the parameter list or body brace when the match ends on one.
            let header = whole.as_str();
            let from = if header.ends_with('(') || header.ends_with('{') {
                whole.end() - 1
            } else {
                whole.end()
            };
            let end_offset = body_end(source, from);
            functions.push(FunctionDef {
                name: name.as_str().to_string(),
                span: Span::new(start_line, index.line_of(end_offset)),
            });
        }
    }
    functions
}

/// Byte offset where the body starting after `from` ends.
///
/// Looks for the first `{` outside parentheses; an expression-bodied arrow
/// ends at `;` or at the end of its line.
fn body_end(source: &str, from: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = from;
    let mut paren = 0i32;
    // Header: find the opening brace of the body.
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line(bytes, i),
            b'(' | b'[' => paren += 1,
            b')' | b']' => paren -= 1,
            b'{' if paren <= 0 => return match_brace(bytes, i),
            b';' if paren <= 0 => return i,
            b'\n' if paren <= 0 && header_complete(&source[from..i]) => return i.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    source.len().saturating_sub(1)
}

/// An arrow header whose last token is not an opener continues onto the
/// next line; anything else ends at the newline.
fn header_complete(header: &str) -> bool {
    let trimmed = header.trim_end();
    !(trimmed.is_empty()
        || trimmed.ends_with("=>")
        || trimmed.ends_with('(')
        || trimmed.ends_with(',')
        || trimmed.ends_with('=')
        || trimmed.ends_with(':'))
}

fn match_brace(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

/// Index of the closing quote of the string starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' if quote != b'`' => return i.saturating_sub(1),
            b if b == quote => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    // Leave the newline for the caller's loop to see.
    i.saturating_sub(1).max(start)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 1;
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

fn js_imports(source: &str, index: &LineIndex) -> Vec<ImportRef> {
    let mut imports: Vec<(usize, String)> = Vec::new();
    for regex in [&*JS_IMPORT, &*JS_REEXPORT, &*JS_REQUIRE] {
        for caps in regex.captures_iter(source) {
            if let Some(spec) = caps.get(1) {
                imports.push((spec.start(), spec.as_str().to_string()));
            }
        }
    }
    imports.sort_by_key(|(offset, _)| *offset);
    imports
        .into_iter()
        .map(|(offset, specifier)| ImportRef {
            specifier,
            line: index.line_of(offset),
        })
        .collect()
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn python_functions(source: &str, index: &LineIndex) -> Vec<FunctionDef> {
    let lines: Vec<&str> = source.lines().collect();
    let mut functions = Vec::new();
    for caps in PY_DEF.captures_iter(source) {
        let (Some(indent), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let start_line = index.line_of(name.start());
        let def_indent = indentation(indent.as_str());
        let mut end_line = start_line;
        for (offset, line) in lines.iter().enumerate().skip(start_line) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if indentation(line) <= def_indent && !trimmed.starts_with(')') {
                break;
            }
            end_line = offset + 1;
        }
        functions.push(FunctionDef {
            name: name.as_str().to_string(),
            span: Span::new(start_line, end_line),
        });
    }
    functions
}

fn python_imports(source: &str, index: &LineIndex) -> Vec<ImportRef> {
    let mut imports: Vec<(usize, String)> = Vec::new();
    for caps in PY_FROM_IMPORT.captures_iter(source) {
        let (Some(module), Some(names)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let module_str = module.as_str();
        if module_str.chars().all(|c| c == '.') {
            // `from . import views` names sibling modules.
            for name in names.as_str().split(',') {
                let name = name.split_whitespace().next().unwrap_or("");
                if !name.is_empty() && name != "*" {
                    imports.push((module.start(), format!("{}{}", module_str, name)));
                }
            }
        } else {
            imports.push((module.start(), module_str.to_string()));
        }
    }
    for caps in PY_IMPORT.captures_iter(source) {
        if let Some(module) = caps.get(1) {
            imports.push((module.start(), module.as_str().to_string()));
        }
    }
    imports.sort_by_key(|(offset, _)| *offset);
    imports
        .into_iter()
        .map(|(offset, specifier)| ImportRef {
            specifier,
            line: index.line_of(offset),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_of(facts: &SourceFacts, name: &str) -> Span {
        facts.functions.iter().find(|f| f.name == name).unwrap().span
    }

    #[test]
    fn test_js_functions_and_spans() {
        let source = r#"import { api } from "../lib/api";

export default function Settings({ user }) {
  const handleSave = async () => {
    await api.post("/settings", { name: "x" });
  };
  const label = (x) => x.toUpperCase();
  return <form onSubmit={handleSave}>{label(user.name)}</form>;
}

class Store {
  async load(id) {
    return fetch(`/api/items/${id}`);
  }
}
"#;
        let facts = extract("src/pages/settings.tsx", "typescript", source);
        assert_eq!(span_of(&facts, "Settings"), Span::new(3, 9));
        assert_eq!(span_of(&facts, "handleSave"), Span::new(4, 6));
        assert_eq!(span_of(&facts, "label"), Span::new(7, 7));
        assert_eq!(span_of(&facts, "load"), Span::new(12, 14));
        assert_eq!(facts.imports[0].specifier, "../lib/api");
        assert_eq!(facts.source, FactSource::Fallback);
    }

    #[test]
    fn test_js_import_forms() {
        let source = r#"
import React from 'react';
import {
  a,
  b,
} from "./multi";
import './styles.css';
export * from './reexported';
const legacy = require('../legacy');
const Lazy = lazy(() => import('./Lazy'));
"#;
        let facts = extract("a.js", "javascript", source);
        let specs: Vec<&str> = facts.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(
            specs,
            vec!["react", "./multi", "./styles.css", "./reexported", "../legacy", "./Lazy"]
        );
        assert_eq!(facts.imports[1].line, 6);
    }

    #[test]
    fn test_control_keywords_are_not_methods() {
        let source = "function a() {\n  if (x) {\n    y();\n  }\n}\n";
        let facts = extract("a.js", "javascript", source);
        assert_eq!(facts.functions.len(), 1);
        assert_eq!(span_of(&facts, "a"), Span::new(1, 5));
    }

    #[test]
    fn test_python_functions_and_imports() {
        let source = r#"from flask import render_template
from . import models, forms
from ..services.billing import charge
import requests


def index():
    items = models.Item.query.all()
    return render_template("index.html", items=items)


class View:
    def get(self, id):
        # fetch
        return charge(id)

    async def post(self):
        pass
"#;
        let facts = extract("app/views.py", "python", source);
        assert_eq!(span_of(&facts, "index"), Span::new(7, 9));
        assert_eq!(span_of(&facts, "get"), Span::new(13, 15));
        assert_eq!(span_of(&facts, "post"), Span::new(17, 18));
        let specs: Vec<&str> = facts.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["flask", ".models", ".forms", "..services.billing", "requests"]);
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }
}
