//! Language-specific analyzer implementations.

mod ecmascript;
mod grammar;
mod javascript;
mod python;
mod typescript;

pub use javascript::JavaScriptAnalyzer;
pub use python::PythonAnalyzer;
pub use typescript::TypeScriptAnalyzer;

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;

// One analyzer instance per language. `get_or_init` blocks concurrent
// callers until the instance exists.
static JAVASCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();
static TYPESCRIPT_ANALYZER: OnceCell<TypeScriptAnalyzer> = OnceCell::new();

/// Create every language analyzer up front.
///
/// Optional; `get_analyzer` initializes on first use.
pub fn register_analyzers() {
    JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new);
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new);
    TYPESCRIPT_ANALYZER.get_or_init(TypeScriptAnalyzer::new);
}

/// Get an analyzer for the given file extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    match ext {
        "js" | "jsx" | "mjs" | "cjs" => Some(JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new)),
        "py" => Some(PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new)),
        "ts" | "tsx" | "mts" | "cts" => Some(TYPESCRIPT_ANALYZER.get_or_init(TypeScriptAnalyzer::new)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_extension() {
        assert_eq!(get_analyzer("tsx").unwrap().language_id(), "typescript");
        assert_eq!(get_analyzer("mjs").unwrap().language_id(), "javascript");
        assert_eq!(get_analyzer("py").unwrap().language_id(), "python");
        assert!(get_analyzer("vue").is_none());
        assert!(get_analyzer("py").unwrap().handles_extension("py"));
    }

    #[test]
    fn test_concurrent_first_lookup_always_finds_analyzer() {
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    get_analyzer("ts").map(|a| a.language_id())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some("typescript"));
        }
    }
}
