//! Glob tool — pattern-based file listing for the tool-using Executor
//! variant. Shares the `globset`+`walkdir` combination the Discovery
//! walker uses for its own directory scan.

use std::path::PathBuf;

use globset::{Glob, GlobSetBuilder};
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::registry::{Tool, ToolResult};

pub struct GlobTool {
    workspace_root: PathBuf,
}

impl GlobTool {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "List workspace-relative paths matching a glob pattern, e.g. 'src/**/*.ts'."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" }
            },
            "required": ["pattern"]
        })
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(pattern) = args["pattern"].as_str() else {
            return ToolResult::error("Missing required parameter: pattern");
        };

        let glob = match Glob::new(pattern) {
            Ok(g) => g,
            Err(e) => return ToolResult::error(format!("invalid pattern: {e}")),
        };
        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        let set = match builder.build() {
            Ok(s) => s,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.workspace_root)
            .into_iter()
            .filter_entry(|e| !is_denied(e.path()))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.workspace_root) {
                if set.is_match(relative) {
                    matches.push(relative.to_string_lossy().to_string());
                }
            }
        }
        matches.sort();

        ToolResult::Json(json!({ "matches": matches }))
    }
}

fn is_denied(path: &std::path::Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some("node_modules") | Some(".git") | Some("dist") | Some("build")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn glob_matches_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/components")).unwrap();
        std::fs::write(dir.path().join("src/components/Button.tsx"), "").unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "").unwrap();

        let tool = GlobTool::new(dir.path());
        let result = tool.execute(json!({"pattern": "src/**/*.tsx"})).await;
        let text = result.to_content_string();
        assert!(text.contains("Button.tsx"));
        assert!(!text.contains("index.ts"));
    }

    #[tokio::test]
    async fn glob_excludes_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.ts"), "").unwrap();

        let tool = GlobTool::new(dir.path());
        let result = tool.execute(json!({"pattern": "**/*.ts"})).await;
        assert!(!result.to_content_string().contains("node_modules"));
    }
}
