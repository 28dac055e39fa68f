//! Screen discovery: which files are screens, their routes and names, and
//! the navigation edges between them.

mod navigation;
mod routes;

pub use navigation::{extract_targets, resolve_targets};
pub use routes::{map_route, route_matches, screen_name, RouteMatch};

use crate::model::{Framework, ScreenKind};
use crate::paths;

/// A file recognized as a screen, before flows are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenCandidate {
    pub source_file: String,
    pub route_path: String,
    pub kind: ScreenKind,
    pub name: String,
}

/// Discover screens among `paths` under the given convention (`None` for
/// the generic heuristic). Sorted by route then file; duplicates collapse.
pub fn discover_screens<S: AsRef<str>>(framework: Option<Framework>, paths: &[S]) -> Vec<ScreenCandidate> {
    let mut screens: Vec<ScreenCandidate> = paths
        .iter()
        .map(|p| paths::normalize(p.as_ref()))
        .filter_map(|path| {
            let RouteMatch { route_path, kind } = map_route(framework, &path)?;
            if route_path.is_empty() {
                return None;
            }
            Some(ScreenCandidate {
                name: screen_name(&route_path, kind),
                source_file: path,
                route_path,
                kind,
            })
        })
        .collect();

    screens.sort_by(|a, b| {
        a.route_path
            .cmp(&b.route_path)
            .then_with(|| a.source_file.cmp(&b.source_file))
    });
    screens.dedup_by(|a, b| a.route_path == b.route_path && a.source_file == b.source_file);

    tracing::debug!(
        framework = framework.map(|f| f.as_str()).unwrap_or("generic"),
        screens = screens.len(),
        "screen discovery complete"
    );
    screens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_sorted_and_deduped() {
        let paths = [
            "app/settings/page.tsx",
            "app/page.tsx",
            "./app/page.tsx",
            "app/users/[id]/page.tsx",
            "app/components/Button.tsx",
        ];
        let screens = discover_screens(Some(Framework::NextjsApp), &paths);
        let routes: Vec<&str> = screens.iter().map(|s| s.route_path.as_str()).collect();
        assert_eq!(routes, vec!["/", "/settings", "/users/:id"]);
        assert_eq!(screens[0].name, "Home");
        assert_eq!(screens[2].name, "Users Detail");
    }

    #[test]
    fn test_generic_discovery() {
        let screens = discover_screens(None, &["src/pages/home.tsx", "src/lib/api.ts"]);
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].route_path, "/");
        assert_eq!(screens[0].kind, ScreenKind::Page);
        assert_eq!(screens[0].source_file, "src/pages/home.tsx");
    }
}
