//! JavaScript language analyzer using tree-sitter.

use std::path::Path;

use super::ecmascript;
use super::grammar::Grammar;
use crate::analysis::{LanguageAnalyzer, ParsedFile, SourceFacts};

pub struct JavaScriptAnalyzer {
    grammar: Grammar,
}

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            grammar: ecmascript::grammar(tree_sitter_javascript::LANGUAGE.into()),
        }
    }
}

impl Default for JavaScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let tree = self.grammar.parse(source)?.ok_or_else(|| {
            anyhow::anyhow!("failed to parse JavaScript source: {}", path.display())
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFacts> {
        ecmascript::extract_facts(&self.grammar, self.language_id(), parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commonjs_module() {
        let source = r#"
const db = require('./db');

module.exports = {
  list: async function () {
    return db.users.findMany();
  },
  remove(id) {
    return db.users.delete(id);
  },
};

function helper() {}
"#;
        let analyzer = JavaScriptAnalyzer::new();
        let parsed = analyzer.parse(Path::new("lib/users.js"), source.as_bytes()).unwrap();
        let facts = analyzer.extract_facts(&parsed).unwrap();

        assert_eq!(facts.imports.len(), 1);
        assert_eq!(facts.imports[0].specifier, "./db");
        let names: Vec<&str> = facts.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["list", "remove", "helper"]);
    }
}
