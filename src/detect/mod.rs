//! Framework detection from repository paths.
//!
//! Scores each known framework convention against a weighted rule table and
//! picks a primary framework when the best score clears a threshold.

mod signatures;

pub use signatures::{Rule, RULES};

use std::collections::BTreeSet;

use crate::model::{Framework, FrameworkCandidate, FrameworkDetection};
use crate::paths;

/// Minimum score for a candidate to become `primary`.
pub const MIN_PRIMARY_SCORE: u32 = 3;

/// Score at which a lone candidate reaches full confidence.
pub const SATURATION_SCORE: u32 = 8;

/// Detect the framework convention of a repository from its file paths.
///
/// Input order and duplicates do not affect the result.
pub fn detect_framework<S: AsRef<str>>(paths: &[S]) -> FrameworkDetection {
    let normalized: BTreeSet<String> = paths
        .iter()
        .map(|p| paths::normalize(p.as_ref()))
        .filter(|p| !p.is_empty() && !paths::is_ignored(p))
        .collect();

    let mut candidates: Vec<FrameworkCandidate> = Framework::ALL
        .iter()
        .map(|&framework| FrameworkCandidate {
            framework,
            score: 0,
            signals: Vec::new(),
        })
        .collect();

    for (index, rule) in RULES.iter().enumerate() {
        if !normalized.iter().any(|p| rule.matches(index, p)) {
            continue;
        }
        if let Some(candidate) = candidates.iter_mut().find(|c| c.framework == rule.framework) {
            candidate.score += rule.weight;
            candidate.signals.push(rule.name.to_string());
        }
    }

    candidates.retain(|c| c.score > 0);
    // Stable sort keeps `Framework::ALL` order among equal scores.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    let total: u32 = candidates.iter().map(|c| c.score).sum();
    let (primary, confidence) = match candidates.first() {
        Some(top) if top.score >= MIN_PRIMARY_SCORE => {
            let share = top.score as f64 / total as f64;
            let saturation = (top.score as f64 / SATURATION_SCORE as f64).min(1.0);
            (Some(top.framework), round3(share * saturation))
        }
        _ => (None, 0.0),
    };

    tracing::debug!(
        files = normalized.len(),
        primary = primary.map(|f| f.as_str()).unwrap_or("none"),
        confidence,
        "framework detection complete"
    );

    FrameworkDetection {
        detected: candidates,
        primary,
        confidence,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nextjs_app_router() {
        let result = detect_framework(&[
            "package.json",
            "next.config.mjs",
            "app/layout.tsx",
            "app/page.tsx",
            "app/dashboard/page.tsx",
        ]);
        assert_eq!(result.primary, Some(Framework::NextjsApp));
        assert_eq!(result.detected[0].score, 10);
        assert_eq!(
            result.detected[0].signals,
            vec!["next-config", "app-router-page", "app-router-layout"]
        );
        // next-config alone also scores nextjs-pages.
        assert_eq!(result.detected[1].framework, Framework::NextjsPages);
        assert!(result.confidence > 0.6 && result.confidence < 0.7);
    }

    #[test]
    fn test_nextjs_pages_router() {
        let result = detect_framework(&["next.config.js", "pages/_app.tsx", "pages/index.tsx"]);
        assert_eq!(result.primary, Some(Framework::NextjsPages));
        assert_eq!(result.detected[0].score, 9);
    }

    #[test]
    fn test_remix_sveltekit_nuxt() {
        let remix = detect_framework(&["remix.config.js", "app/root.tsx", "app/routes/_index.tsx"]);
        assert_eq!(remix.primary, Some(Framework::Remix));

        let svelte = detect_framework(&["svelte.config.js", "src/routes/+page.svelte"]);
        assert_eq!(svelte.primary, Some(Framework::Sveltekit));

        let nuxt = detect_framework(&["nuxt.config.ts", "app.vue", "pages/index.vue"]);
        assert_eq!(nuxt.primary, Some(Framework::Nuxt));
        assert_eq!(nuxt.confidence, 1.0);
    }

    #[test]
    fn test_cli_tool() {
        let result = detect_framework(&["bin/tool", "src/commands/deploy.ts", "src/cli.ts"]);
        assert_eq!(result.primary, Some(Framework::Cli));
        assert_eq!(result.detected[0].score, 6);
    }

    #[test]
    fn test_below_threshold_is_generic() {
        let result = detect_framework(&["src/pages/home.tsx", "src/lib/api.ts"]);
        assert_eq!(result.primary, None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.tag(), "generic");
        assert_eq!(result.detected.len(), 1);
    }

    #[test]
    fn test_empty_tree() {
        let result = detect_framework::<&str>(&[]);
        assert!(result.detected.is_empty());
        assert_eq!(result.primary, None);
    }

    #[test]
    fn test_rule_counts_once_and_order_is_irrelevant() {
        let a = detect_framework(&["app/page.tsx", "app/a/page.tsx", "app/b/page.tsx", "next.config.js"]);
        let b = detect_framework(&["next.config.js", "./app/b/page.tsx", "app/page.tsx", "app/a/page.tsx", "app/page.tsx"]);
        assert_eq!(a, b);
        assert_eq!(a.detected[0].score, 8);
    }

    #[test]
    fn test_ties_break_by_table_order() {
        // next-config alone scores both Next variants equally.
        let result = detect_framework(&["next.config.js"]);
        assert_eq!(result.primary, Some(Framework::NextjsApp));
        assert_eq!(result.detected[0].score, result.detected[1].score);
    }

    #[test]
    fn test_ignored_dirs_do_not_count() {
        let result = detect_framework(&["node_modules/next/app/page.tsx", "node_modules/x/next.config.js"]);
        assert!(result.detected.is_empty());
    }
}
