//! TypeScript language analyzer using tree-sitter.
//!
//! `.tsx` files need the TSX grammar; JSX in a file parsed with the plain
//! TypeScript grammar produces ERROR nodes around every element.

use std::path::Path;

use super::ecmascript;
use super::grammar::Grammar;
use crate::analysis::{LanguageAnalyzer, ParsedFile, SourceFacts};

pub struct TypeScriptAnalyzer {
    typescript: Grammar,
    tsx: Grammar,
}

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            typescript: ecmascript::grammar(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            tsx: ecmascript::grammar(tree_sitter_typescript::LANGUAGE_TSX.into()),
        }
    }

    fn grammar_for(&self, path: &str) -> &Grammar {
        if path.ends_with(".tsx") {
            &self.tsx
        } else {
            &self.typescript
        }
    }
}

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts", "cts"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let path_str = path.to_string_lossy().to_string();
        let tree = self.grammar_for(&path_str).parse(source)?.ok_or_else(|| {
            anyhow::anyhow!("failed to parse TypeScript source: {}", path.display())
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path_str,
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFacts> {
        ecmascript::extract_facts(self.grammar_for(&parsed.path), self.language_id(), parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;

    fn facts(path: &str, source: &str) -> SourceFacts {
        let analyzer = TypeScriptAnalyzer::new();
        let parsed = analyzer.parse(Path::new(path), source.as_bytes()).unwrap();
        analyzer.extract_facts(&parsed).unwrap()
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import express from 'express';
import type { Handler } from './types';
import * as fs from 'fs';
export { helper } from "../lib/helper";
const Chart = lazy(() => import('./Chart'));
"#;
        let facts = facts("server.ts", source);
        let specs: Vec<&str> = facts.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["express", "./types", "fs", "../lib/helper", "./Chart"]);
        assert_eq!(facts.imports[1].line, 3);
    }

    #[test]
    fn test_extract_definitions_tsx() {
        let source = r#"import { useState } from "react";

export default function Settings() {
  const [name, setName] = useState("");
  const handleSave = async () => {
    await fetch("/api/settings", { method: "POST" });
  };
  return <form onSubmit={handleSave}><input value={name} /></form>;
}

class Store {
  load(id: string) {
    return id;
  }
}
"#;
        let facts = facts("app/settings/page.tsx", source);
        assert!(!facts.has_parse_errors);
        let settings = facts.functions.iter().find(|f| f.name == "Settings").unwrap();
        assert_eq!(settings.span, Span::new(3, 9));
        let save = facts.functions.iter().find(|f| f.name == "handleSave").unwrap();
        assert_eq!(save.span, Span::new(5, 7));
        assert!(facts.functions.iter().any(|f| f.name == "load"));
    }
}
