//! Core traits for language analysis.

use std::path::Path;

use super::SourceFacts;

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    pub tree: tree_sitter::Tree,
    /// Source text, kept for node text extraction.
    pub source: Vec<u8>,
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Language-specific analyzer.
///
/// tree_sitter::Parser is not Sync, so implementations create a parser per
/// call rather than storing one.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "typescript").
    fn language_id(&self) -> &'static str;

    /// File extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file. Partial parse errors still yield a tree with
    /// ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract function definitions and imports from a parsed file.
    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFacts>;

    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
