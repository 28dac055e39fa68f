//! Import specifier resolution against the repository tree.
//!
//! Relative and aliased specifiers resolve to files that exist in the tree;
//! bare package names resolve to nothing.

use std::collections::BTreeSet;

use crate::paths;

/// Extensions tried, in order, for extensionless script specifiers.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "svelte"];

/// Path aliases and the directories they may point at, most specific first.
const ALIASES: &[(&str, &[&str])] = &[
    ("$lib/", &["src/lib/"]),
    ("~~/", &["src/", ""]),
    ("@/", &["src/", ""]),
    ("~/", &["src/", "app/", ""]),
];

/// Resolve `specifier`, written in `from`, to a file in `tree`.
pub fn resolve_import(specifier: &str, from: &str, tree: &BTreeSet<String>) -> Option<String> {
    if paths::extension(from).as_deref() == Some("py") {
        return resolve_python(specifier, from, tree);
    }

    if specifier.starts_with("./") || specifier.starts_with("../") {
        let base = paths::join(paths::parent(from), specifier);
        return resolve_script(&base, tree);
    }

    for (alias, targets) in ALIASES {
        if let Some(rest) = specifier.strip_prefix(alias) {
            return targets
                .iter()
                .find_map(|target| resolve_script(&paths::normalize(&format!("{}{}", target, rest)), tree));
        }
    }

    None
}

fn resolve_script(base: &str, tree: &BTreeSet<String>) -> Option<String> {
    if base.starts_with("..") {
        return None;
    }
    if tree.contains(base) && paths::extension(base).is_some() {
        return Some(base.to_string());
    }
    SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| format!("{}.{}", base, ext))
        .chain(
            SCRIPT_EXTENSIONS
                .iter()
                .map(|ext| format!("{}/index.{}", base, ext)),
        )
        .find(|candidate| tree.contains(candidate))
}

fn resolve_python(specifier: &str, from: &str, tree: &BTreeSet<String>) -> Option<String> {
    let dots = specifier.chars().take_while(|c| *c == '.').count();
    let module = specifier[dots..].replace('.', "/");

    let bases: Vec<String> = if dots > 0 {
        let mut dir = paths::parent(from).to_string();
        for _ in 1..dots {
            dir = paths::parent(&dir).to_string();
        }
        vec![paths::join(&dir, &module)]
    } else {
        vec![paths::normalize(&module), paths::join("src", &module)]
    };

    bases
        .iter()
        .filter(|base| !base.is_empty())
        .flat_map(|base| [format!("{}.py", base), format!("{}/__init__.py", base)])
        .find(|candidate| tree.contains(candidate))
}
