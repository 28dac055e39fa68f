//! Repository-relative path helpers.
//!
//! Every path that enters the engine is normalized once so ids, sorting and
//! lookups never depend on how a provider spelled it.

/// Directory names that never contain application source worth scanning.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    ".nuxt",
    ".svelte-kit",
    "dist",
    "build",
    "out",
    "coverage",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
];

/// Normalize a repository path: forward slashes, no leading `./` or `/`,
/// no empty or `.` segments, `..` resolved where possible.
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Directory part of a normalized path ("" for root-level files).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Extension without the dot, lowercased.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let idx = name.rfind('.')?;
    if idx == 0 {
        return None;
    }
    Some(name[idx + 1..].to_ascii_lowercase())
}

/// File name without its final extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Join a directory and a relative specifier, then normalize.
pub fn join(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        normalize(relative)
    } else {
        normalize(&format!("{}/{}", dir, relative))
    }
}

/// Whether a path sits under a directory that is never scanned.
pub fn is_ignored(path: &str) -> bool {
    path.split('/').any(|segment| IGNORED_DIRS.contains(&segment))
}

/// Whether a path looks like a test, story or spec file.
pub fn is_test_file(path: &str) -> bool {
    let name = file_name(path);
    name.contains(".test.")
        || name.contains(".spec.")
        || name.contains(".stories.")
        || name.starts_with("test_")
        || path.split('/').any(|s| s == "__tests__" || s == "__mocks__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./src//pages/index.tsx"), "src/pages/index.tsx");
        assert_eq!(normalize("/app/page.tsx"), "app/page.tsx");
        assert_eq!(normalize("src\\lib\\api.ts"), "src/lib/api.ts");
        assert_eq!(normalize("src/components/../lib/api.ts"), "src/lib/api.ts");
    }

    #[test]
    fn test_components() {
        assert_eq!(parent("src/pages/index.tsx"), "src/pages");
        assert_eq!(parent("index.tsx"), "");
        assert_eq!(file_name("src/pages/index.tsx"), "index.tsx");
        assert_eq!(file_stem("app/routes/users.$id.tsx"), "users.$id");
        assert_eq!(extension("src/App.TSX").as_deref(), Some("tsx"));
        assert_eq!(extension(".env"), None);
        assert_eq!(extension("bin/cli"), None);
    }

    #[test]
    fn test_join() {
        assert_eq!(join("src/pages", "../lib/api"), "src/lib/api");
        assert_eq!(join("", "./utils"), "utils");
    }

    #[test]
    fn test_ignored_and_test_files() {
        assert!(is_ignored("node_modules/react/index.js"));
        assert!(is_ignored("apps/web/.next/server/page.js"));
        assert!(!is_ignored("src/pages/index.tsx"));
        assert!(is_test_file("src/pages/index.test.tsx"));
        assert!(is_test_file("src/__tests__/home.tsx"));
        assert!(!is_test_file("src/pages/testimonials.tsx"));
    }
}
