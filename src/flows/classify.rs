//! Call-site classification.
//!
//! Each file yields drafts in precedence order: db-query call sites, then
//! api-call sites that do not overlap a db match, then ui-event bindings,
//! then one function-call flow per named definition.

use std::collections::HashSet;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::analysis::SourceFacts;
use crate::model::FlowKind;

const SNIPPET_MAX_CHARS: usize = 160;

lazy_static! {
    static ref DB_PATTERNS: Vec<Regex> = [
        r"\bprisma\.(\w+)\.(\w+)\(",
        r"\b(?:db|knex|sequelize|pool|conn|connection|mongoose|drizzle)\.((?:\w+\.)*\w+)\(",
        r#"\bsupabase\s*\.\s*from\(\s*['"](\w+)['"]"#,
        r"\bsql\s*`",
        r"\b(?:cursor|session)\.(execute|executemany|query|add|commit|delete|scalars)\(",
        r"\b(\w+)\.objects\.(\w+)\(",
        r"\b(\w+)\.query\.(filter_by|filter|get|all|first|order_by)\(",
        r"\b(\w+)\.(findOne|insertOne|insertMany|updateOne|updateMany|deleteOne|deleteMany|aggregate|countDocuments)\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref API_PATTERNS: Vec<Regex> = [
        r#"\b(fetch|\$fetch|useFetch|useSWR|axios|ky)\(\s*(?:['"`]([^'"`]*)['"`])?"#,
        r#"\b(axios|ky|http|https|api|apiClient|\$http|requests|httpx|got|superagent)\.(get|post|put|patch|delete|head|request)\(\s*(?:['"`]([^'"`]*)['"`])?"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// JSX `onClick={...}`; the handler expression is brace-matched separately.
    static ref JSX_EVENT: Regex = Regex::new(r"\b(on[A-Z]\w*)\s*=\s*\{").unwrap();
    /// Svelte `on:click={...}` with optional modifiers.
    static ref SVELTE_EVENT: Regex = Regex::new(r"\bon:(\w+)(?:\|[\w|]+)?\s*=\s*\{").unwrap();
    /// Vue `@click="..."` / `v-on:submit.prevent="..."`.
    static ref VUE_EVENT: Regex = Regex::new(r#"(?:@|\bv-on:)(\w+)(?:\.[\w.]+)?\s*=\s*"([^"]*)""#).unwrap();
    /// DOM `addEventListener('click', handler)`.
    static ref DOM_EVENT: Regex =
        Regex::new(r#"\baddEventListener\(\s*['"](\w+)['"]\s*,\s*([\w$.]+)"#).unwrap();
    static ref IDENTIFIER_EXPR: Regex =
        Regex::new(r"^\s*(?:[A-Za-z_$][\w$]*\.)*([A-Za-z_$][\w$]*)\s*$").unwrap();
    static ref INVOCATION: Regex = Regex::new(r"\b([A-Za-z_$][\w$]*)\s*\(").unwrap();
}

const NOT_INVOCATIONS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "typeof", "await", "def",
    "elif", "not", "and", "or", "in", "print",
];

/// One classified unit of behavior before ids exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDraft {
    pub kind: FlowKind,
    pub name: String,
    pub line: usize,
    /// Byte offset of the call site or definition.
    pub offset: usize,
    pub snippet: String,
    /// Bound handler name for ui-events.
    pub handler: Option<String>,
    /// Byte range of a ui-event's handler expression.
    pub expr: Option<Range<usize>>,
    /// Index into `SourceFacts::functions` for function-call flows.
    pub definition: Option<usize>,
}

/// A `name(` occurrence that may call a known function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub line: usize,
    pub offset: usize,
}

struct Lines<'a> {
    source: &'a str,
    starts: Vec<usize>,
    comments: HashSet<usize>,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str, python: bool) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            starts,
            comments: comment_lines(source, python),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    fn text(&self, line: usize) -> &'a str {
        let start = self.starts.get(line - 1).copied().unwrap_or(self.source.len());
        let end = self
            .starts
            .get(line)
            .map(|s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        &self.source[start..end.max(start)]
    }

    fn is_comment(&self, offset: usize) -> bool {
        self.comments.contains(&self.line_of(offset))
    }

    fn snippet(&self, line: usize) -> String {
        truncate(self.text(line).trim())
    }
}

/// Lines that are entirely comments.
fn comment_lines(source: &str, python: bool) -> HashSet<usize> {
    let mut lines = HashSet::new();
    let mut in_block = false;
    for (i, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if in_block {
            lines.insert(i + 1);
            if trimmed.contains("*/") {
                in_block = false;
            }
            continue;
        }
        let is_comment = if python {
            trimmed.starts_with('#')
        } else {
            trimmed.starts_with("//") || trimmed.starts_with("<!--") || trimmed.starts_with('*')
        };
        if !python && trimmed.starts_with("/*") {
            lines.insert(i + 1);
            in_block = !trimmed.contains("*/");
            continue;
        }
        if is_comment {
            lines.insert(i + 1);
        }
    }
    lines
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= SNIPPET_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(SNIPPET_MAX_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Whether the text before `offset` on its line declares a function, so the
/// match is a definition rather than a call.
fn is_definition_site(source: &str, offset: usize) -> bool {
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let before = source[line_start..offset].trim_end();
    before.ends_with("function") || before.ends_with("def") || before.ends_with("async def")
}

/// Literal request target, cut at the first interpolation.
fn request_target(raw: &str) -> &str {
    let cut = raw.find("${").or_else(|| raw.find('{')).unwrap_or(raw.len());
    let target = &raw[..cut];
    target.split(['?', '#']).next().unwrap_or(target).trim()
}

fn db_name(caps: &Captures, pattern_index: usize) -> String {
    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
    match pattern_index {
        0 => format!("prisma.{}.{}", group(1), group(2)),
        1 => {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            whole.trim_end_matches('(').trim().to_string()
        }
        2 => format!("supabase.from {}", group(1)),
        3 => "sql".to_string(),
        4 => {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            whole.trim_end_matches('(').to_string()
        }
        5 => format!("{}.objects.{}", group(1), group(2)),
        6 => format!("{}.query.{}", group(1), group(2)),
        _ => format!("{}.{}", group(1), group(2)),
    }
}

fn api_name(caps: &Captures, pattern_index: usize) -> String {
    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    let (callee, target) = match pattern_index {
        0 => (group(1).unwrap_or("fetch").to_string(), group(2)),
        _ => (
            format!("{}.{}", group(1).unwrap_or(""), group(2).unwrap_or("")),
            group(3),
        ),
    };
    match target.map(request_target).filter(|t| !t.is_empty()) {
        Some(target) => format!("{} {}", callee, target),
        None => callee,
    }
}

/// `click` -> `onClick`.
fn event_name(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// Byte index just past the `}` matching the `{` at `open`.
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in source.as_bytes().iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn handler_of(expr: &str) -> Option<String> {
    IDENTIFIER_EXPR
        .captures(expr)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify every call site and definition in one file.
pub fn classify_file(facts: &SourceFacts, source: &str) -> Vec<FlowDraft> {
    let lines = Lines::new(source, facts.language == "python");
    let mut drafts = Vec::new();
    let mut claimed: Vec<Range<usize>> = Vec::new();

    for (index, pattern) in DB_PATTERNS.iter().enumerate() {
        for caps in pattern.captures_iter(source) {
            let Some(m) = caps.get(0) else { continue };
            if lines.is_comment(m.start()) || is_definition_site(source, m.start()) {
                continue;
            }
            if claimed.iter().any(|r| r.start < m.end() && m.start() < r.end) {
                continue;
            }
            claimed.push(m.range());
            let line = lines.line_of(m.start());
            drafts.push(FlowDraft {
                kind: FlowKind::DbQuery,
                name: db_name(&caps, index),
                line,
                offset: m.start(),
                snippet: lines.snippet(line),
                handler: None,
                expr: None,
                definition: None,
            });
        }
    }

    let db_claims = claimed.len();
    for (index, pattern) in API_PATTERNS.iter().enumerate() {
        for caps in pattern.captures_iter(source) {
            let Some(m) = caps.get(0) else { continue };
            if lines.is_comment(m.start()) || is_definition_site(source, m.start()) {
                continue;
            }
            // db matches win; api patterns may also overlap each other.
            if claimed.iter().any(|r| r.start < m.end() && m.start() < r.end) {
                continue;
            }
            claimed.push(m.range());
            let line = lines.line_of(m.start());
            drafts.push(FlowDraft {
                kind: FlowKind::ApiCall,
                name: api_name(&caps, index),
                line,
                offset: m.start(),
                snippet: lines.snippet(line),
                handler: None,
                expr: None,
                definition: None,
            });
        }
    }
    tracing::trace!(path = %facts.path, db = db_claims, total = claimed.len(), "call sites classified");

    drafts.extend(ui_events(source, &lines));

    for (index, function) in facts.functions.iter().enumerate() {
        let line = function.span.start_line;
        let offset = lines.starts.get(line - 1).copied().unwrap_or(0);
        drafts.push(FlowDraft {
            kind: FlowKind::FunctionCall,
            name: function.name.clone(),
            line,
            offset,
            snippet: lines.snippet(line),
            handler: None,
            expr: None,
            definition: Some(index),
        });
    }

    drafts
}

fn ui_events(source: &str, lines: &Lines) -> Vec<FlowDraft> {
    let mut events = Vec::new();

    let mut push = |event: String, at: usize, expr: Range<usize>| {
        let line = lines.line_of(at);
        let handler = handler_of(&source[expr.clone()]);
        let name = format!("{}:{}", event, handler.as_deref().unwrap_or("inline"));
        events.push(FlowDraft {
            kind: FlowKind::UiEvent,
            name,
            line,
            offset: at,
            snippet: lines.snippet(line),
            handler,
            expr: Some(expr),
            definition: None,
        });
    };

    for (regex, jsx) in [(&*JSX_EVENT, true), (&*SVELTE_EVENT, false)] {
        for caps in regex.captures_iter(source) {
            let (Some(m), Some(event)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if lines.is_comment(m.start()) {
                continue;
            }
            let open = m.end() - 1;
            let Some(close) = matching_brace(source, open) else {
                continue;
            };
            let name = if jsx {
                event.as_str().to_string()
            } else {
                event_name(event.as_str())
            };
            push(name, m.start(), open + 1..close);
        }
    }

    for caps in VUE_EVENT.captures_iter(source) {
        let (Some(m), Some(event), Some(expr)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if lines.is_comment(m.start()) {
            continue;
        }
        push(event_name(event.as_str()), m.start(), expr.range());
    }

    for caps in DOM_EVENT.captures_iter(source) {
        let (Some(m), Some(event), Some(handler)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if lines.is_comment(m.start()) {
            continue;
        }
        push(event_name(event.as_str()), m.start(), handler.range());
    }

    events.sort_by_key(|e| e.offset);
    events
}

/// Every `name(` occurrence outside comment lines.
pub fn find_invocations(facts: &SourceFacts, source: &str) -> Vec<Invocation> {
    let lines = Lines::new(source, facts.language == "python");
    INVOCATION
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .filter(|m| !NOT_INVOCATIONS.contains(&m.as_str()))
        .filter(|m| !lines.is_comment(m.start()))
        .map(|m| Invocation {
            name: m.as_str().to_string(),
            line: lines.line_of(m.start()),
            offset: m.start(),
        })
        .collect()
}
