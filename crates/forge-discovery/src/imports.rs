//! Import-graph expansion — component D.6. Parses `import` statements,
//! resolves relative and tsconfig-alias paths, and expands the selected
//! context set forward (files a target imports) and backward (files that
//! import a target).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use regex::Regex;

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ProjectConfig {
    pub aliases: HashMap<String, String>,
    pub base_url: Option<String>,
    pub package_manager: Option<String>,
    pub dependencies: Vec<String>,
}

fn import_regex() -> Regex {
    Regex::new(r#"(?m)^\s*import\s+(?:[^'"]*?\s+from\s+)?['"]([^'"]+)['"]"#).unwrap()
}

/// Extract the raw specifiers of every `import ... from '<specifier>'` (or
/// bare `import '<specifier>'`) statement in `content`.
pub fn parse_import_specifiers(content: &str) -> Vec<String> {
    import_regex()
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Resolve a specifier relative to `from_path` (a workspace-relative file),
/// consulting `project_config`'s aliases/baseUrl for non-relative
/// specifiers. Returns `None` for bare package imports that match no alias
/// (those are external dependencies, not workspace files).
pub fn resolve_specifier(
    from_path: &str,
    specifier: &str,
    project_config: &ProjectConfig,
    known_paths: &HashSet<String>,
) -> Option<String> {
    let candidate = if specifier.starts_with('.') {
        let base = Path::new(from_path).parent().unwrap_or(Path::new(""));
        normalize(&base.join(specifier))
    } else {
        let mut resolved = None;
        for (alias, target) in &project_config.aliases {
            let alias_prefix = alias.trim_end_matches('*');
            if specifier.starts_with(alias_prefix) {
                let rest = &specifier[alias_prefix.len()..];
                resolved = Some(format!("{}{rest}", target.trim_end_matches('*')));
                break;
            }
        }
        match resolved {
            Some(r) => r,
            None => {
                if let Some(base_url) = &project_config.base_url {
                    format!("{base_url}/{specifier}")
                } else {
                    return None;
                }
            }
        }
    };

    find_with_extension(&candidate, known_paths)
}

fn normalize(path: &Path) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::Normal(p) => parts.push(p.to_str().unwrap_or("")),
            _ => {}
        }
    }
    parts.join("/")
}

const RESOLVABLE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn find_with_extension(candidate: &str, known_paths: &HashSet<String>) -> Option<String> {
    if known_paths.contains(candidate) {
        return Some(candidate.to_string());
    }
    for ext in RESOLVABLE_EXTENSIONS {
        let with_ext = format!("{candidate}.{ext}");
        if known_paths.contains(&with_ext) {
            return Some(with_ext);
        }
        let index = format!("{candidate}/index.{ext}");
        if known_paths.contains(&index) {
            return Some(index);
        }
    }
    None
}

/// Forward expansion: for every file in `selected`, add the workspace files
/// it imports (that resolve to a known path) to the returned set.
pub fn expand_imports(
    root: &Path,
    selected: &[String],
    project_config: &ProjectConfig,
    known_paths: &HashSet<String>,
) -> HashSet<String> {
    let mut expanded = HashSet::new();
    for path in selected {
        let Ok(content) = std::fs::read_to_string(root.join(path)) else {
            continue;
        };
        for specifier in parse_import_specifiers(&content) {
            if let Some(resolved) =
                resolve_specifier(path, &specifier, project_config, known_paths)
            {
                expanded.insert(resolved);
            }
        }
    }
    expanded
}

/// Reverse expansion: files among `all_files` that import any file in
/// `targets`.
pub fn expand_importers(
    root: &Path,
    all_files: &[String],
    targets: &HashSet<String>,
    project_config: &ProjectConfig,
    known_paths: &HashSet<String>,
) -> HashSet<String> {
    let mut importers = HashSet::new();
    for path in all_files {
        if targets.contains(path) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(root.join(path)) else {
            continue;
        };
        for specifier in parse_import_specifiers(&content) {
            if let Some(resolved) = resolve_specifier(path, &specifier, project_config, known_paths)
            {
                if targets.contains(&resolved) {
                    importers.insert(path.clone());
                    break;
                }
            }
        }
    }
    importers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_and_named_imports() {
        let content = "import React from 'react';\nimport { useTheme } from './theme';\n";
        let specifiers = parse_import_specifiers(content);
        assert_eq!(specifiers, vec!["react".to_string(), "./theme".to_string()]);
    }

    #[test]
    fn resolves_relative_specifier_against_known_paths() {
        let mut known = HashSet::new();
        known.insert("src/theme.ts".to_string());
        let resolved = resolve_specifier(
            "src/index.ts",
            "./theme",
            &ProjectConfig::default(),
            &known,
        );
        assert_eq!(resolved, Some("src/theme.ts".to_string()));
    }

    #[test]
    fn resolves_alias_specifier() {
        let mut config = ProjectConfig::default();
        config.aliases.insert("@/*".to_string(), "src/*".to_string());
        let mut known = HashSet::new();
        known.insert("src/components/Button.tsx".to_string());
        let resolved = resolve_specifier(
            "src/index.ts",
            "@/components/Button",
            &config,
            &known,
        );
        assert_eq!(resolved, Some("src/components/Button.tsx".to_string()));
    }

    #[test]
    fn returns_none_for_unresolvable_external_package() {
        let known = HashSet::new();
        let resolved = resolve_specifier("src/index.ts", "lodash", &ProjectConfig::default(), &known);
        assert_eq!(resolved, None);
    }
}
