//! Signature rules for framework detection.
//!
//! Table order is the tie-break order. Root config files outweigh directory
//! conventions because a config file is an explicit declaration.

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;

use crate::model::Framework;

/// Weight of a root-level framework config file.
pub const CONFIG_WEIGHT: u32 = 5;

/// Root config file name -> signal name.
pub static CONFIG_FILES: phf::Map<&'static str, &'static str> = phf_map! {
    "next.config.js" => "next-config",
    "next.config.mjs" => "next-config",
    "next.config.cjs" => "next-config",
    "next.config.ts" => "next-config",
    "remix.config.js" => "remix-config",
    "remix.config.mjs" => "remix-config",
    "svelte.config.js" => "svelte-config",
    "svelte.config.ts" => "svelte-config",
    "nuxt.config.ts" => "nuxt-config",
    "nuxt.config.js" => "nuxt-config",
};

/// What a rule looks for.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// A root config file mapping to this signal name in `CONFIG_FILES`.
    Config(&'static str),
    /// A regex over normalized paths.
    Path(&'static str),
}

/// One weighted signature.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub framework: Framework,
    pub weight: u32,
    pub matcher: Matcher,
}

pub const RULES: &[Rule] = &[
    // nextjs-app
    Rule {
        name: "next-config",
        framework: Framework::NextjsApp,
        weight: CONFIG_WEIGHT,
        matcher: Matcher::Config("next-config"),
    },
    Rule {
        name: "app-router-page",
        framework: Framework::NextjsApp,
        weight: 3,
        matcher: Matcher::Path(r"^(src/)?app/(.+/)?page\.(tsx|jsx|ts|js|mdx)$"),
    },
    Rule {
        name: "app-router-layout",
        framework: Framework::NextjsApp,
        weight: 2,
        matcher: Matcher::Path(r"^(src/)?app/layout\.(tsx|jsx|ts|js)$"),
    },
    // nextjs-pages
    Rule {
        name: "next-config",
        framework: Framework::NextjsPages,
        weight: CONFIG_WEIGHT,
        matcher: Matcher::Config("next-config"),
    },
    Rule {
        name: "pages-dir",
        framework: Framework::NextjsPages,
        weight: 2,
        matcher: Matcher::Path(r"^(src/)?pages/.+\.(tsx|jsx|ts|js)$"),
    },
    Rule {
        name: "pages-app-shell",
        framework: Framework::NextjsPages,
        weight: 2,
        matcher: Matcher::Path(r"^(src/)?pages/_(app|document)\.(tsx|jsx|ts|js)$"),
    },
    // remix
    Rule {
        name: "remix-config",
        framework: Framework::Remix,
        weight: CONFIG_WEIGHT,
        matcher: Matcher::Config("remix-config"),
    },
    Rule {
        name: "remix-routes",
        framework: Framework::Remix,
        weight: 3,
        matcher: Matcher::Path(r"^app/routes/[^/]+"),
    },
    Rule {
        name: "remix-root",
        framework: Framework::Remix,
        weight: 2,
        matcher: Matcher::Path(r"^app/root\.(tsx|jsx)$"),
    },
    // sveltekit
    Rule {
        name: "svelte-config",
        framework: Framework::Sveltekit,
        weight: CONFIG_WEIGHT,
        matcher: Matcher::Config("svelte-config"),
    },
    Rule {
        name: "svelte-page",
        framework: Framework::Sveltekit,
        weight: 3,
        matcher: Matcher::Path(r"^src/routes/(.+/)?\+page\.svelte$"),
    },
    Rule {
        name: "svelte-app-html",
        framework: Framework::Sveltekit,
        weight: 2,
        matcher: Matcher::Path(r"^src/app\.html$"),
    },
    // nuxt
    Rule {
        name: "nuxt-config",
        framework: Framework::Nuxt,
        weight: CONFIG_WEIGHT,
        matcher: Matcher::Config("nuxt-config"),
    },
    Rule {
        name: "nuxt-pages",
        framework: Framework::Nuxt,
        weight: 2,
        matcher: Matcher::Path(r"^pages/.+\.vue$"),
    },
    Rule {
        name: "nuxt-app",
        framework: Framework::Nuxt,
        weight: 2,
        matcher: Matcher::Path(r"^app\.vue$"),
    },
    // cli
    Rule {
        name: "bin-dir",
        framework: Framework::Cli,
        weight: 2,
        matcher: Matcher::Path(r"^bin/[^/]+$"),
    },
    Rule {
        name: "commands-dir",
        framework: Framework::Cli,
        weight: 2,
        matcher: Matcher::Path(r"^(src/)?(commands|cmd)/.+\.(ts|js|mjs|py|go)$"),
    },
    Rule {
        name: "cli-entry",
        framework: Framework::Cli,
        weight: 2,
        matcher: Matcher::Path(r"^(src/)?(cli\.(ts|js|mjs|py)|__main__\.py)$"),
    },
];

lazy_static! {
    /// Compiled path matchers, index-aligned with `RULES` (None for config rules).
    static ref COMPILED: Vec<Option<Regex>> = RULES
        .iter()
        .map(|rule| match rule.matcher {
            Matcher::Path(pattern) => Some(Regex::new(pattern).unwrap()),
            Matcher::Config(_) => None,
        })
        .collect();
}

impl Rule {
    /// Whether this rule matches a normalized path. `index` is the rule's
    /// position in `RULES`.
    pub fn matches(&self, index: usize, path: &str) -> bool {
        match self.matcher {
            Matcher::Config(signal) => CONFIG_FILES.get(path).is_some_and(|s| *s == signal),
            Matcher::Path(_) => COMPILED
                .get(index)
                .and_then(|r| r.as_ref())
                .is_some_and(|r| r.is_match(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, framework: Framework) -> (usize, &'static Rule) {
        RULES
            .iter()
            .enumerate()
            .find(|(_, r)| r.name == name && r.framework == framework)
            .unwrap()
    }

    #[test]
    fn test_config_rules_are_root_only() {
        let (i, r) = rule("next-config", Framework::NextjsApp);
        assert!(r.matches(i, "next.config.mjs"));
        assert!(!r.matches(i, "apps/web/next.config.mjs"));
    }

    #[test]
    fn test_path_rules() {
        let (i, r) = rule("app-router-page", Framework::NextjsApp);
        assert!(r.matches(i, "app/page.tsx"));
        assert!(r.matches(i, "src/app/(shop)/cart/page.tsx"));
        assert!(!r.matches(i, "app/components/page-header.tsx"));

        let (i, r) = rule("svelte-page", Framework::Sveltekit);
        assert!(r.matches(i, "src/routes/+page.svelte"));
        assert!(r.matches(i, "src/routes/blog/[slug]/+page.svelte"));

        let (i, r) = rule("pages-dir", Framework::NextjsPages);
        assert!(!r.matches(i, "pages/index.vue"));
    }

    #[test]
    fn test_every_path_rule_compiles() {
        assert_eq!(COMPILED.len(), RULES.len());
    }
}
