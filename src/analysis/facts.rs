//! Fact structures extracted from a source file.

use std::fmt;

/// Line span, 1-indexed and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Create a span from a tree-sitter node.
    #[cfg(feature = "tree-sitter")]
    pub fn from_node(node: tree_sitter::Node) -> Self {
        // tree-sitter rows are 0-indexed
        Self::new(node.start_position().row + 1, node.end_position().row + 1)
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Number of lines covered.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Shift by `offset` lines (for script blocks inside component files).
    pub fn shifted(&self, offset: usize) -> Self {
        Self::new(self.start_line + offset, self.end_line + offset)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}

/// A named function or method definition with its body span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub span: Span,
}

/// A static import specifier as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub line: usize,
}

/// How the facts were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactSource {
    Syntax,
    Fallback,
}

/// All facts extracted from a single file.
#[derive(Debug, Clone)]
pub struct SourceFacts {
    pub path: String,
    pub language: String,
    /// Definitions sorted by start line.
    pub functions: Vec<FunctionDef>,
    /// Import specifiers in source order, deduplicated.
    pub imports: Vec<ImportRef>,
    pub has_parse_errors: bool,
    pub source: FactSource,
}

impl SourceFacts {
    pub fn empty(path: &str, language: &str, source: FactSource) -> Self {
        Self {
            path: path.to_string(),
            language: language.to_string(),
            functions: Vec::new(),
            imports: Vec::new(),
            has_parse_errors: false,
            source,
        }
    }

    /// The innermost function whose span contains `line`.
    pub fn enclosing_function(&self, line: usize) -> Option<usize> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.span.contains(line))
            .min_by_key(|(_, f)| f.span.line_count())
            .map(|(i, _)| i)
    }

    /// Sort definitions and drop duplicate imports, keeping first occurrence.
    pub fn normalize(&mut self) {
        self.functions
            .sort_by(|a, b| a.span.start_line.cmp(&b.span.start_line).then_with(|| a.name.cmp(&b.name)));
        self.functions
            .dedup_by(|a, b| a.name == b.name && a.span == b.span);
        let mut seen = std::collections::HashSet::new();
        self.imports.retain(|i| seen.insert(i.specifier.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, start: usize, end: usize) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            span: Span::new(start, end),
        }
    }

    #[test]
    fn test_enclosing_function_prefers_innermost() {
        let mut facts = SourceFacts::empty("a.ts", "typescript", FactSource::Syntax);
        facts.functions = vec![def("Page", 1, 20), def("handleSave", 5, 8)];
        assert_eq!(facts.enclosing_function(6), Some(1));
        assert_eq!(facts.enclosing_function(12), Some(0));
        assert_eq!(facts.enclosing_function(30), None);
    }

    #[test]
    fn test_normalize_dedups_imports() {
        let mut facts = SourceFacts::empty("a.ts", "typescript", FactSource::Syntax);
        facts.imports = vec![
            ImportRef { specifier: "./api".to_string(), line: 1 },
            ImportRef { specifier: "./api".to_string(), line: 2 },
        ];
        facts.functions = vec![def("b", 9, 10), def("a", 2, 3)];
        facts.normalize();
        assert_eq!(facts.imports.len(), 1);
        assert_eq!(facts.functions[0].name, "a");
    }
}
