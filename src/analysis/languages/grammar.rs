//! A tree-sitter language with its definition and import queries compiled
//! once per analyzer.

use once_cell::sync::OnceCell;
use tree_sitter::{Language, Parser, Query, Tree};

pub(super) struct CompiledQueries {
    pub definitions: Query,
    pub imports: Query,
}

pub(super) struct Grammar {
    language: Language,
    definition_source: &'static str,
    import_source: &'static str,
    queries: OnceCell<CompiledQueries>,
}

impl Grammar {
    pub fn new(language: Language, definition_source: &'static str, import_source: &'static str) -> Self {
        Self {
            language,
            definition_source,
            import_source,
            queries: OnceCell::new(),
        }
    }

    /// Queries for this grammar, compiled on first use.
    pub fn queries(&self) -> anyhow::Result<&CompiledQueries> {
        self.queries.get_or_try_init(|| {
            Ok(CompiledQueries {
                definitions: Query::new(&self.language, self.definition_source)?,
                imports: Query::new(&self.language, self.import_source)?,
            })
        })
    }

    /// Parse `source`. tree_sitter::Parser is not Sync, so each call gets
    /// its own parser.
    pub fn parse(&self, source: &[u8]) -> anyhow::Result<Option<Tree>> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser.parse(source, None))
    }
}
