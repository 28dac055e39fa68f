//! Python language analyzer using tree-sitter.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor};

use super::grammar::Grammar;

use crate::analysis::{
    FactSource, FunctionDef, ImportRef, LanguageAnalyzer, ParsedFile, SourceFacts, Span,
};

/// Function and method definitions. Decorated definitions match through the
/// inner `function_definition`.
const DEFINITION_QUERY: &str = r#"
(function_definition
  name: (identifier) @name
) @def
"#;

const IMPORT_QUERY: &str = r#"
(import_statement) @import
(import_from_statement) @import_from
"#;

pub struct PythonAnalyzer {
    grammar: Grammar,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            grammar: Grammar::new(tree_sitter_python::LANGUAGE.into(), DEFINITION_QUERY, IMPORT_QUERY),
        }
    }

    fn extract_definitions(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<FunctionDef>> {
        let query = &self.grammar.queries()?.definitions;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

        let mut functions = Vec::new();
        while let Some(m) = matches.next() {
            let mut name = None;
            let mut def_node = None;
            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "name" => name = Some(parsed.node_text(capture.node).to_string()),
                    "def" => def_node = Some(capture.node),
                    _ => {}
                }
            }
            if let (Some(name), Some(node)) = (name, def_node) {
                functions.push(FunctionDef {
                    name,
                    span: Span::from_node(node),
                });
            }
        }
        Ok(functions)
    }

    fn extract_imports(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<ImportRef>> {
        let query = &self.grammar.queries()?.imports;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let line = node.start_position().row + 1;
                match query.capture_names()[capture.index as usize] {
                    "import" => {
                        for name in imported_names(node) {
                            imports.push(ImportRef {
                                specifier: parsed.node_text(name).to_string(),
                                line,
                            });
                        }
                    }
                    "import_from" => {
                        let Some(module) = node.child_by_field_name("module_name") else {
                            continue;
                        };
                        let module_text = parsed.node_text(module);
                        if module_text.chars().all(|c| c == '.') {
                            // `from . import views` names sibling modules.
                            for name in imported_names(node) {
                                imports.push(ImportRef {
                                    specifier: format!("{}{}", module_text, parsed.node_text(name)),
                                    line,
                                });
                            }
                        } else {
                            imports.push(ImportRef {
                                specifier: module_text.to_string(),
                                line,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(imports)
    }
}

/// The dotted names bound by an import statement, unwrapping aliases.
fn imported_names(statement: Node) -> Vec<Node> {
    let mut cursor = statement.walk();
    let names = statement
        .children_by_field_name("name", &mut cursor)
        .filter_map(|child| match child.kind() {
            "dotted_name" => Some(child),
            "aliased_import" => child.child_by_field_name("name"),
            _ => None,
        })
        .collect();
    names
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let tree = self.grammar.parse(source)?.ok_or_else(|| {
            anyhow::anyhow!("failed to parse Python source: {}", path.display())
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFacts> {
        let mut facts = SourceFacts::empty(&parsed.path, self.language_id(), FactSource::Syntax);
        facts.functions = self.extract_definitions(parsed)?;
        facts.imports = self.extract_imports(parsed)?;
        facts.has_parse_errors = parsed.tree.root_node().has_error();
        facts.normalize();
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_and_imports() {
        let source = r#"import os.path
import requests as rq
from flask import Blueprint, render_template
from . import models, forms
from ..services.billing import charge

bp = Blueprint("orders", __name__)


@bp.route("/orders")
def list_orders():
    return render_template("orders.html", orders=models.Order.query.all())


class OrderView:
    def post(self):
        return charge(1)
"#;
        let analyzer = PythonAnalyzer::new();
        let parsed = analyzer.parse(Path::new("app/views/orders.py"), source.as_bytes()).unwrap();
        let facts = analyzer.extract_facts(&parsed).unwrap();

        let specs: Vec<&str> = facts.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(
            specs,
            vec!["os.path", "requests", "flask", ".models", ".forms", "..services.billing"]
        );

        let list = facts.functions.iter().find(|f| f.name == "list_orders").unwrap();
        assert_eq!(list.span, Span::new(11, 12));
        let post = facts.functions.iter().find(|f| f.name == "post").unwrap();
        assert_eq!(post.span, Span::new(16, 17));
    }
}
