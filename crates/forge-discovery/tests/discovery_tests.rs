//! End-to-end discovery over small synthetic project trees.

use std::collections::HashMap;

use forge_discovery::{discover, ProjectConfig};

fn write(root: &std::path::Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn theme_task_surfaces_theme_files_over_unrelated_ones() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/theme/tokens.css",
        ":root {\n  --brand-color: blue;\n}\n.card {\n  color: var(--brand-color);\n}\n",
    );
    write(
        dir.path(),
        "src/theme/useTheme.ts",
        "export function useTheme() { return 'dark'; }\n",
    );
    write(dir.path(), "src/auth/login.ts", "export function login() {}\n");
    write(dir.path(), "node_modules/pkg/index.js", "module.exports = {};\n");

    let output = discover(
        dir.path(),
        "switch the color theme to dark mode",
        None,
        ProjectConfig::default(),
        true,
    )
    .await
    .unwrap();

    assert!(!output.structure.files.iter().any(|f| f.path.contains("node_modules")));

    let top_paths: Vec<&str> = output
        .scored_context_files
        .iter()
        .take(2)
        .map(|f| f.path.as_str())
        .collect();
    assert!(top_paths.contains(&"src/theme/tokens.css") || top_paths.contains(&"src/theme/useTheme.ts"));
    assert!(!top_paths.contains(&"src/auth/login.ts"));
}

#[tokio::test]
async fn import_expansion_pulls_in_dependency_of_selected_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/widget/Widget.tsx",
        "import { formatWidget } from './format';\nexport function Widget() { return formatWidget(); }\n",
    );
    write(
        dir.path(),
        "src/widget/format.ts",
        "export function formatWidget() { return 'ok'; }\n",
    );

    let output = discover(dir.path(), "fix the widget rendering", None, ProjectConfig::default(), true)
        .await
        .unwrap();

    assert!(output
        .scored_context_files
        .iter()
        .any(|f| f.path == "src/widget/format.ts"));
}

#[tokio::test]
async fn next_framework_pulls_layout_companion_for_page_keyword() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/dashboard/page.tsx", "export default function Page() { return null; }\n");
    write(dir.path(), "app/dashboard/layout.tsx", "export default function Layout() { return null; }\n");

    let output = discover(
        dir.path(),
        "update the dashboard page",
        Some("next"),
        ProjectConfig::default(),
        true,
    )
    .await
    .unwrap();

    assert!(output
        .scored_context_files
        .iter()
        .any(|f| f.path == "app/dashboard/layout.tsx"));
}

#[tokio::test]
async fn project_config_round_trips_through_output() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/index.ts", "export const x = 1;\n");

    let mut aliases = HashMap::new();
    aliases.insert("@/*".to_string(), "src/*".to_string());
    let config = ProjectConfig {
        aliases,
        base_url: Some("src".to_string()),
        package_manager: Some("pnpm".to_string()),
        dependencies: vec!["react".to_string()],
    };

    let output = discover(dir.path(), "touch index", None, config.clone(), false)
        .await
        .unwrap();
    assert_eq!(output.project_config.package_manager, config.package_manager);
}
