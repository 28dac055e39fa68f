//! File path -> route path mapping for each framework convention.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{Framework, ScreenKind};
use crate::paths;

lazy_static! {
    static ref NEXT_APP: Regex =
        Regex::new(r"^(?:src/)?app/(?:(.+)/)?page\.(?:tsx|jsx|ts|js|mdx)$").unwrap();
    static ref NEXT_PAGES: Regex =
        Regex::new(r"^(?:src/)?pages/(.+)\.(?:tsx|jsx|ts|js|mdx)$").unwrap();
    static ref REMIX: Regex = Regex::new(r"^app/routes/(.+)\.(?:tsx|jsx|ts|js|mdx)$").unwrap();
    static ref SVELTEKIT: Regex = Regex::new(r"^src/routes/(?:(.+)/)?\+page\.svelte$").unwrap();
    static ref NUXT: Regex = Regex::new(r"^pages/(.+)\.vue$").unwrap();
    static ref CLI_COMMAND: Regex =
        Regex::new(r"^(?:src/)?(?:commands|cmd)/(.+)\.(?:ts|js|mjs|py|go)$").unwrap();
    static ref CLI_BIN: Regex = Regex::new(r"^bin/([A-Za-z0-9_.-]+)$").unwrap();
    static ref GENERIC: Regex = Regex::new(
        r"(?:^|/)(pages|routes|screens|views)/(.+)\.(?:tsx|jsx|ts|js|vue|svelte|mdx|py)$"
    )
    .unwrap();
}

/// A file recognized as a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route_path: String,
    pub kind: ScreenKind,
}

impl RouteMatch {
    fn new(route_path: String, kind: ScreenKind) -> Self {
        Self { route_path, kind }
    }
}

/// Map a normalized path to a route under `framework`, or the generic
/// heuristic when no framework was detected.
pub fn map_route(framework: Option<Framework>, path: &str) -> Option<RouteMatch> {
    if paths::is_ignored(path) || paths::is_test_file(path) {
        return None;
    }
    match framework {
        Some(Framework::NextjsApp) => nextjs_app(path),
        Some(Framework::NextjsPages) => nextjs_pages(path),
        Some(Framework::Remix) => remix(path),
        Some(Framework::Sveltekit) => sveltekit(path),
        Some(Framework::Nuxt) => nuxt(path),
        Some(Framework::Cli) => cli(path),
        None => generic(path),
    }
}

fn to_route(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// `[id]` -> `:id`, `[...slug]` / `[[...slug]]` -> `*slug`, `[[id]]` -> `:id`.
fn bracket_segment(segment: &str) -> String {
    let inner = segment
        .trim_start_matches('[')
        .trim_end_matches(']');
    if !segment.starts_with('[') {
        return segment.to_string();
    }
    match inner.strip_prefix("...") {
        Some(rest) => format!("*{}", rest),
        None => format!(":{}", inner),
    }
}

fn is_group(segment: &str) -> bool {
    segment.starts_with('(') && segment.ends_with(')')
}

fn nextjs_app(path: &str) -> Option<RouteMatch> {
    let caps = NEXT_APP.captures(path)?;
    let mut segments = Vec::new();
    if let Some(dir) = caps.get(1) {
        for segment in dir.as_str().split('/') {
            if segment.starts_with('_') {
                return None;
            }
            if is_group(segment) || segment.starts_with('@') {
                continue;
            }
            segments.push(bracket_segment(segment));
        }
    }
    Some(RouteMatch::new(to_route(&segments), ScreenKind::Page))
}

fn nextjs_pages(path: &str) -> Option<RouteMatch> {
    let caps = NEXT_PAGES.captures(path)?;
    let rest = caps.get(1)?.as_str();
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.first() == Some(&"api") {
        return None;
    }
    if parts.iter().any(|p| p.starts_with('_')) {
        return None;
    }
    let mut segments: Vec<String> = parts.iter().map(|p| bracket_segment(p)).collect();
    if segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }
    Some(RouteMatch::new(to_route(&segments), ScreenKind::Page))
}

fn remix_segment(segment: &str) -> Option<String> {
    if segment == "_index" || segment == "index" || segment.starts_with('_') {
        return None;
    }
    let segment = segment.trim_end_matches('_');
    let segment = segment.trim_start_matches('(').trim_end_matches(')');
    if segment == "$" {
        return Some("*".to_string());
    }
    match segment.strip_prefix('$') {
        Some(param) => Some(format!(":{}", param)),
        None if segment.is_empty() => None,
        None => Some(segment.to_string()),
    }
}

fn remix(path: &str) -> Option<RouteMatch> {
    let caps = REMIX.captures(path)?;
    let rest = caps.get(1)?.as_str();
    let mut parts: Vec<&str> = rest.split('/').collect();
    // Folder routes: `app/routes/users.$id/route.tsx`.
    if parts.len() > 1 && parts.last() == Some(&"route") {
        parts.pop();
    }
    let segments: Vec<String> = parts
        .iter()
        .flat_map(|p| p.split('.'))
        .filter_map(remix_segment)
        .collect();
    Some(RouteMatch::new(to_route(&segments), ScreenKind::View))
}

fn sveltekit(path: &str) -> Option<RouteMatch> {
    let caps = SVELTEKIT.captures(path)?;
    let segments: Vec<String> = caps
        .get(1)
        .map(|dir| {
            dir.as_str()
                .split('/')
                .filter(|s| !is_group(s))
                .map(bracket_segment)
                .collect()
        })
        .unwrap_or_default();
    Some(RouteMatch::new(to_route(&segments), ScreenKind::Page))
}

fn nuxt(path: &str) -> Option<RouteMatch> {
    let caps = NUXT.captures(path)?;
    let rest = caps.get(1)?.as_str();
    let mut segments: Vec<String> = rest.split('/').map(bracket_segment).collect();
    if segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }
    Some(RouteMatch::new(to_route(&segments), ScreenKind::View))
}

fn cli(path: &str) -> Option<RouteMatch> {
    if let Some(caps) = CLI_BIN.captures(path) {
        let name = paths::file_stem(caps.get(1)?.as_str());
        return Some(RouteMatch::new(name.to_string(), ScreenKind::CliCommand));
    }
    let caps = CLI_COMMAND.captures(path)?;
    let mut words: Vec<&str> = caps.get(1)?.as_str().split('/').collect();
    if matches!(words.last(), Some(&"index") | Some(&"main") | Some(&"__init__")) {
        words.pop();
    }
    if words.is_empty() || words.iter().any(|w| w.starts_with('_')) {
        return None;
    }
    Some(RouteMatch::new(words.join(" "), ScreenKind::CliCommand))
}

fn generic(path: &str) -> Option<RouteMatch> {
    let caps = GENERIC.captures(path)?;
    let kind = match caps.get(1)?.as_str() {
        "screens" => ScreenKind::Screen,
        "views" => ScreenKind::View,
        _ => ScreenKind::Page,
    };
    let rest = caps.get(2)?.as_str();
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.iter().any(|p| p.starts_with('_')) {
        return None;
    }
    let at_root = parts.len() == 1;
    let mut segments: Vec<String> = parts
        .iter()
        .map(|p| match p.strip_prefix('$') {
            Some(param) => format!(":{}", param),
            None => bracket_segment(p),
        })
        .collect();
    match segments.last().map(String::as_str) {
        Some("index") => {
            segments.pop();
        }
        Some("home") if at_root => {
            segments.pop();
        }
        _ => {}
    }
    Some(RouteMatch::new(to_route(&segments), kind))
}

/// Whether `pattern` (with `:param` and `*rest` segments) matches the
/// concrete path `target`.
pub fn route_matches(pattern: &str, target: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    for (i, segment) in pattern.iter().enumerate() {
        if segment.starts_with('*') {
            return target.len() > i;
        }
        match target.get(i) {
            Some(t) if segment.starts_with(':') || segment == t => continue,
            _ => return false,
        }
    }
    pattern.len() == target.len()
}

/// Number of dynamic segments; lower is more specific.
pub fn dynamic_segments(pattern: &str) -> usize {
    pattern
        .split('/')
        .filter(|s| s.starts_with(':') || s.starts_with('*'))
        .count()
}

fn title_case(word: &str) -> String {
    word.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable screen name derived from its route.
pub fn screen_name(route_path: &str, kind: ScreenKind) -> String {
    if kind == ScreenKind::CliCommand {
        return title_case(route_path);
    }
    let segments: Vec<&str> = route_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "Home".to_string();
    }
    let is_dynamic = |s: &&str| s.starts_with(':') || s.starts_with('*');
    let base = segments
        .iter()
        .rev()
        .find(|s| !is_dynamic(*s))
        .map(|s| title_case(s));
    let ends_dynamic = segments.last().is_some_and(is_dynamic);
    match (base, ends_dynamic) {
        (Some(base), true) => format!("{} Detail", base),
        (Some(base), false) => base,
        (None, _) => "Detail".to_string(),
    }
}
