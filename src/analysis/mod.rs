//! Per-file source facts: named function definitions with body spans and
//! import specifiers.
//!
//! TypeScript, JavaScript and Python go through tree-sitter when the
//! `tree-sitter` feature is enabled. Vue and Svelte single-file components
//! are analyzed through their `<script>` blocks. Anything the syntax layer
//! cannot handle falls back to the regex extractor in `fallback`.

mod facts;
mod fallback;
#[cfg(feature = "tree-sitter")]
mod languages;
#[cfg(feature = "tree-sitter")]
mod traits;

pub use facts::{FactSource, FunctionDef, ImportRef, SourceFacts, Span};
#[cfg(feature = "tree-sitter")]
pub use languages::{
    get_analyzer, register_analyzers, JavaScriptAnalyzer, PythonAnalyzer, TypeScriptAnalyzer,
};
#[cfg(feature = "tree-sitter")]
pub use traits::{LanguageAnalyzer, ParsedFile};

use lazy_static::lazy_static;
use regex::Regex;

use crate::paths;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r#"(?s)<script\b([^>]*)>(.*?)</script>"#).unwrap();
}

/// Extensions the analyzer understands.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py", "vue", "svelte",
];

/// Whether a path is a source file the analyzer extracts facts from.
pub fn is_source_file(path: &str) -> bool {
    paths::extension(path).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

fn language_for(ext: &str) -> Option<&'static str> {
    match ext {
        "ts" | "tsx" | "mts" | "cts" => Some("typescript"),
        "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
        "py" => Some("python"),
        "vue" => Some("vue"),
        "svelte" => Some("svelte"),
        _ => None,
    }
}

/// Extract facts from one file. Never fails: unsupported files yield empty
/// facts and unparseable files fall back to regex extraction.
pub fn analyze_source(path: &str, source: &str) -> SourceFacts {
    let Some(ext) = paths::extension(path) else {
        return SourceFacts::empty(path, "unknown", FactSource::Fallback);
    };
    match language_for(&ext) {
        Some("vue") | Some("svelte") => analyze_component(path, &ext, source),
        Some(language) => analyze_script(path, &ext, language, source),
        None => SourceFacts::empty(path, "unknown", FactSource::Fallback),
    }
}

#[cfg(feature = "tree-sitter")]
fn analyze_script(path: &str, ext: &str, language: &str, source: &str) -> SourceFacts {
    let Some(analyzer) = get_analyzer(ext) else {
        return fallback::extract(path, language, source);
    };
    let result = analyzer
        .parse(std::path::Path::new(path), source.as_bytes())
        .and_then(|parsed| analyzer.extract_facts(&parsed));
    match result {
        Ok(mut facts) => {
            facts.path = path.to_string();
            facts
        }
        Err(e) => {
            tracing::debug!(path, error = %e, "syntax analysis failed, using fallback");
            fallback::extract(path, language, source)
        }
    }
}

#[cfg(not(feature = "tree-sitter"))]
fn analyze_script(path: &str, _ext: &str, language: &str, source: &str) -> SourceFacts {
    fallback::extract(path, language, source)
}

/// Analyze the `<script>` blocks of a Vue or Svelte component, shifting
/// line numbers back into the component file.
fn analyze_component(path: &str, ext: &str, source: &str) -> SourceFacts {
    let language = if ext == "vue" { "vue" } else { "svelte" };
    let mut facts = SourceFacts::empty(path, language, FactSource::Syntax);

    for caps in SCRIPT_BLOCK.captures_iter(source) {
        let (Some(attrs), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let attrs = attrs.as_str();
        let is_ts = attrs.contains(r#"lang="ts""#) || attrs.contains("lang='ts'");
        let script_ext = if is_ts { "ts" } else { "js" };
        let script_language = if script_ext == "ts" { "typescript" } else { "javascript" };
        let offset = source[..body.start()].matches('\n').count();

        let block = analyze_script(path, script_ext, script_language, body.as_str());
        if block.source == FactSource::Fallback {
            facts.source = FactSource::Fallback;
        }
        facts.has_parse_errors |= block.has_parse_errors;
        facts.functions.extend(block.functions.into_iter().map(|f| FunctionDef {
            name: f.name,
            span: f.span.shifted(offset),
        }));
        facts.imports.extend(block.imports.into_iter().map(|i| ImportRef {
            specifier: i.specifier,
            line: i.line + offset,
        }));
    }

    facts.normalize();
    facts
}
