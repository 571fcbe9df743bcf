//! Repository export index — component D.3. Over indexable source files,
//! extract top-level exports by regex and classify each file's role by
//! filename suffix, directory keyword, and export-name heuristics, in that
//! priority order.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

const INDEXABLE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "svelte", "css", "scss",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Component,
    Hook,
    Util,
    Type,
    Config,
    Test,
    Style,
    Other,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FileIndexEntry {
    pub path: String,
    pub exports: Vec<String>,
    pub role: FileRole,
    pub size: u64,
}

pub type RepositoryIndex = HashMap<String, FileIndexEntry>;

pub fn is_indexable(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| INDEXABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_style_file(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("css") | Some("scss")
    )
}

fn export_regex() -> Regex {
    Regex::new(
        r"(?m)^export\s+(?:default\s+)?(?:function|const|let|var|class|interface|type|enum)\s+(\w+)",
    )
    .unwrap()
}

fn export_brace_regex() -> Regex {
    Regex::new(r"(?m)^export\s*\{([^}]*)\}").unwrap()
}

fn selector_regex() -> Regex {
    Regex::new(r"(?m)^\s*([.:][A-Za-z][\w-]*|--[\w-]+)").unwrap()
}

/// Extract exported identifiers (TS/JS) or top-level selectors and custom
/// properties (CSS/SCSS) from `content`.
pub fn extract_exports(path: &str, content: &str) -> Vec<String> {
    if is_style_file(path) {
        return selector_regex()
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
    }

    let mut exports = Vec::new();
    for cap in export_regex().captures_iter(content) {
        if let Some(name) = cap.get(1) {
            exports.push(name.as_str().to_string());
        }
    }
    for cap in export_brace_regex().captures_iter(content) {
        if let Some(names) = cap.get(1) {
            for name in names.as_str().split(',') {
                let name = name.split(" as ").next().unwrap_or(name).trim();
                if !name.is_empty() {
                    exports.push(name.to_string());
                }
            }
        }
    }
    exports
}

/// Classify a file's role by filename suffix, then directory keyword, then
/// export-name shape — in that priority order, per the spec.
pub fn classify(path: &str, exports: &[String]) -> FileRole {
    let lower = path.to_lowercase();

    if lower.contains(".test.") || lower.contains(".spec.") || lower.contains("__tests__") {
        return FileRole::Test;
    }
    if lower.contains(".config.") || lower.ends_with(".config.ts") || lower.ends_with(".config.js")
    {
        return FileRole::Config;
    }
    if is_style_file(path) {
        return FileRole::Style;
    }
    if lower.ends_with(".d.ts") || lower.contains("/types/") || lower.contains("/types.ts") {
        return FileRole::Type;
    }

    if lower.contains("/components/") || lower.contains("/component/") {
        return FileRole::Component;
    }
    if lower.contains("/hooks/") {
        return FileRole::Hook;
    }
    if lower.contains("/utils/") || lower.contains("/lib/") || lower.contains("/helpers/") {
        return FileRole::Util;
    }

    if exports
        .iter()
        .any(|e| e.starts_with("use") && e.chars().nth(3).is_some_and(|c| c.is_uppercase()))
    {
        return FileRole::Hook;
    }
    if exports.iter().any(|e| {
        e.chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false)
    }) {
        return FileRole::Component;
    }

    FileRole::Other
}

/// Build the full repository index over `files`, reading each indexable
/// file's content to extract exports and classify its role. Files larger
/// than `max_bytes` are skipped (their metadata is still recorded).
pub fn build_index(
    root: &Path,
    files: &[crate::walk::WalkedFile],
    max_bytes: u64,
) -> RepositoryIndex {
    let mut index = RepositoryIndex::new();
    for file in files {
        if !is_indexable(&file.path) {
            continue;
        }
        let exports = if file.size <= max_bytes {
            std::fs::read_to_string(root.join(&file.path))
                .map(|content| extract_exports(&file.path, &content))
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let role = classify(&file.path, &exports);
        index.insert(
            file.path.clone(),
            FileIndexEntry {
                path: file.path.clone(),
                exports,
                role,
                size: file.size,
            },
        );
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_function_export() {
        let content = "export function useTheme() {}\n";
        let exports = extract_exports("src/hooks/useTheme.ts", content);
        assert_eq!(exports, vec!["useTheme".to_string()]);
    }

    #[test]
    fn extracts_brace_export_list() {
        let content = "export { Button, Input as TextInput };\n";
        let exports = extract_exports("src/components/index.ts", content);
        assert_eq!(exports, vec!["Button".to_string(), "Input".to_string()]);
    }

    #[test]
    fn extracts_css_selectors_and_custom_properties() {
        let content = ".card {\n  color: red;\n}\n:root {\n  --brand-color: blue;\n}\n";
        let mut exports = extract_exports("src/theme/tokens.css", content);
        exports.sort();
        assert!(exports.contains(&".card".to_string()));
        assert!(exports.contains(&"--brand-color".to_string()));
    }

    #[test]
    fn classifies_by_filename_suffix_first() {
        let role = classify("src/components/Button.test.tsx", &[]);
        assert_eq!(role, FileRole::Test);
    }

    #[test]
    fn classifies_by_directory_keyword() {
        let role = classify("src/hooks/something.ts", &["getValue".to_string()]);
        assert_eq!(role, FileRole::Hook);
    }

    #[test]
    fn classifies_by_export_name_heuristic() {
        let role = classify("src/weird/Card.ts", &["Card".to_string()]);
        assert_eq!(role, FileRole::Component);
    }

    #[test]
    fn classifies_hook_by_use_prefix_export() {
        let role = classify("src/weird/theme.ts", &["useTheme".to_string()]);
        assert_eq!(role, FileRole::Hook);
    }
}
