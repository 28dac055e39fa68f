//! Navigation edges: literal link and redirect targets found in source.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::routes::{dynamic_segments, route_matches};

lazy_static! {
    /// Link props, router calls and redirects followed by a quoted literal.
    static ref NAV_TARGET: Regex = Regex::new(
        r#"(?:\bhref\s*=\s*\{?|\bto\s*=\s*\{?|\brouter\.(?:push|replace)\(|\bnavigate\(|\bredirect\(|\bgoto\(|\bnavigateTo\(|\bwindow\.location(?:\.href)?\s*=|\burl_for\()\s*["'`]([^"'`]*)["'`]"#
    )
    .unwrap();
}

/// Clean a raw target: internal absolute paths only, no query or hash,
/// no interpolation.
fn clean_target(raw: &str) -> Option<String> {
    if !raw.starts_with('/') || raw.starts_with("//") {
        return None;
    }
    if raw.contains("${") || raw.contains('{') {
        return None;
    }
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = &raw[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        Some("/".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

/// Literal navigation targets in a source file.
pub fn extract_targets(source: &str) -> BTreeSet<String> {
    NAV_TARGET
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| clean_target(m.as_str()))
        .collect()
}

/// Resolve concrete targets against known route patterns.
///
/// A target that equals a route is kept; one matching a dynamic route maps to
/// the most specific matching pattern; anything else is kept as written.
/// `own_route` is removed so a screen never lists itself.
pub fn resolve_targets(targets: &BTreeSet<String>, routes: &[&str], own_route: &str) -> BTreeSet<String> {
    targets
        .iter()
        .map(|target| {
            if routes.contains(&target.as_str()) {
                return target.clone();
            }
            routes
                .iter()
                .filter(|pattern| route_matches(pattern, target))
                .min_by_key(|pattern| (dynamic_segments(pattern), *pattern))
                .map(|pattern| pattern.to_string())
                .unwrap_or_else(|| target.clone())
        })
        .filter(|route| route != own_route)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_targets() {
        let source = r#"
            <Link href="/settings">Settings</Link>
            <Link href={"/orders?tab=open"}>Orders</Link>
            <NavLink to='/users/42#profile'>User</NavLink>
            router.push("/checkout");
            redirect('/login')
            goto(`/blog/${slug}`)
            <a href="https://example.com">External</a>
            <a href="//cdn.example.com/x.js">Protocol relative</a>
            window.location.href = "/logout";
        "#;
        let targets = extract_targets(source);
        let expected: BTreeSet<String> = [
            "/checkout",
            "/login",
            "/logout",
            "/orders",
            "/settings",
            "/users/42",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_resolve_targets() {
        let routes = ["/", "/users/:id", "/users/new", "/settings"];
        let targets: BTreeSet<String> = ["/users/42", "/users/new", "/settings", "/about"]
            .into_iter()
            .map(String::from)
            .collect();
        let resolved = resolve_targets(&targets, &routes, "/settings");
        let expected: BTreeSet<String> = ["/users/:id", "/users/new", "/about"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_root_target() {
        let targets = extract_targets(r#"<Link href="/">Home</Link>"#);
        assert!(targets.contains("/"));
        assert!(resolve_targets(&targets, &["/"], "/").is_empty());
    }
}
