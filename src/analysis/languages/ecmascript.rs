//! Queries and extraction shared by the JavaScript and TypeScript grammars.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, QueryCursor};

use super::grammar::Grammar;
use crate::analysis::{FactSource, FunctionDef, ImportRef, ParsedFile, SourceFacts, Span};

/// Named function-like definitions. `@def` spans the whole definition.
const DEFINITION_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name
) @def

(generator_function_declaration
  name: (identifier) @name
) @def

(variable_declarator
  name: (identifier) @name
  value: [(arrow_function) (function_expression)]
) @def

(method_definition
  name: (property_identifier) @name
) @def

(pair
  key: (property_identifier) @name
  value: [(arrow_function) (function_expression)]
) @def
"#;

const IMPORT_QUERY: &str = r#"
; import x from 'module' / import 'module'
(import_statement
  source: (string) @source
)

; export * from 'module'
(export_statement
  source: (string) @source
)

; require('module')
(call_expression
  function: (identifier) @require_func (#eq? @require_func "require")
  arguments: (arguments (string) @source)
)

; import('module')
(call_expression
  function: (import)
  arguments: (arguments (string) @source)
)
"#;

/// A JavaScript-family grammar with the shared queries.
pub(super) fn grammar(language: Language) -> Grammar {
    Grammar::new(language, DEFINITION_QUERY, IMPORT_QUERY)
}

pub(super) fn extract_facts(
    grammar: &Grammar,
    language_id: &str,
    parsed: &ParsedFile,
) -> anyhow::Result<SourceFacts> {
    let mut facts = SourceFacts::empty(&parsed.path, language_id, FactSource::Syntax);
    facts.functions = extract_definitions(grammar, parsed)?;
    facts.imports = extract_imports(grammar, parsed)?;
    facts.has_parse_errors = parsed.tree.root_node().has_error();
    facts.normalize();
    Ok(facts)
}

fn extract_definitions(grammar: &Grammar, parsed: &ParsedFile) -> anyhow::Result<Vec<FunctionDef>> {
    let query = &grammar.queries()?.definitions;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

    let mut functions = Vec::new();
    let mut seen_positions = std::collections::HashSet::new();

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
        let (Some(name), Some(node)) = (name, def_node) else {
            continue;
        };
        if name.is_empty() || !seen_positions.insert((node.start_byte(), name.clone())) {
            continue;
        }
        functions.push(FunctionDef {
            name,
            span: Span::from_node(node),
        });
    }

    Ok(functions)
}

fn extract_imports(grammar: &Grammar, parsed: &ParsedFile) -> anyhow::Result<Vec<ImportRef>> {
    let query = &grammar.queries()?.imports;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

    let mut imports = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if query.capture_names()[capture.index as usize] != "source" {
                continue;
            }
            let raw = parsed.node_text(capture.node);
            let specifier = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');
            if !specifier.is_empty() {
                imports.push((
                    capture.node.start_byte(),
                    ImportRef {
                        specifier: specifier.to_string(),
                        line: capture.node.start_position().row + 1,
                    },
                ));
            }
        }
    }

    imports.sort_by_key(|(offset, _)| *offset);
    Ok(imports.into_iter().map(|(_, i)| i).collect())
}
