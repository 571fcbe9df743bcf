//! Framework rules — component D.7. A small table mapping framework names
//! to "always include" path patterns, priority directories, and
//! keyword-triggered companion-file globs (e.g. a `page` file pulls in its
//! sibling `layout`/`loading`/`error` files).

use std::collections::HashMap;

pub struct FrameworkRule {
    pub always_include: Vec<&'static str>,
    pub priority_dirs: Vec<&'static str>,
    pub companions: HashMap<&'static str, Vec<&'static str>>,
}

pub fn rules_for(framework: Option<&str>) -> FrameworkRule {
    match framework.map(str::to_lowercase).as_deref() {
        Some("next") | Some("nextjs") => FrameworkRule {
            always_include: vec!["next.config.*", "tailwind.config.*"],
            priority_dirs: vec!["app", "src/app", "pages"],
            companions: HashMap::from([
                ("page", vec!["layout.*", "loading.*", "error.*"]),
                ("route", vec!["middleware.*"]),
            ]),
        },
        Some("nuxt") | Some("vue") => FrameworkRule {
            always_include: vec!["nuxt.config.*"],
            priority_dirs: vec!["pages", "components", "composables"],
            companions: HashMap::from([("page", vec!["layouts/*.vue"])]),
        },
        Some("sveltekit") | Some("svelte") => FrameworkRule {
            always_include: vec!["svelte.config.*"],
            priority_dirs: vec!["src/routes", "src/lib"],
            companions: HashMap::from([("+page", vec!["+layout.*", "+error.*"])]),
        },
        _ => FrameworkRule {
            always_include: vec![],
            priority_dirs: vec!["src"],
            companions: HashMap::new(),
        },
    }
}

/// Companion file glob patterns triggered by `keyword` appearing in the
/// task text, for the given framework.
pub fn companions_for_keyword(framework: Option<&str>, keyword: &str) -> Vec<&'static str> {
    rules_for(framework)
        .companions
        .get(keyword)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_keyword_pulls_layout_companions() {
        let companions = companions_for_keyword(Some("next"), "page");
        assert!(companions.contains(&"layout.*"));
    }

    #[test]
    fn unknown_framework_falls_back_to_src_priority() {
        let rule = rules_for(Some("totally-unknown"));
        assert_eq!(rule.priority_dirs, vec!["src"]);
    }

    #[test]
    fn framework_name_matching_is_case_insensitive() {
        let rule = rules_for(Some("NEXT"));
        assert!(rule.priority_dirs.contains(&"app"));
    }
}
