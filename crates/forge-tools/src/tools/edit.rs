//! Edit tool — sanitized, fuzzy search/replace for the tool-using Executor
//! variant. Delegates to the same fuzzy-match chain the Change Applier
//! uses, so a tool-using agent's exploratory edits behave identically to
//! the final structured apply.

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::apply::apply_one_edit;
use crate::registry::{Tool, ToolResult};
use crate::sanitize::{sanitize, Operation};

pub struct EditTool {
    workspace_root: PathBuf,
    allowed_write_dirs: Vec<String>,
}

impl EditTool {
    pub fn new(workspace_root: impl Into<PathBuf>, allowed_write_dirs: Vec<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            allowed_write_dirs,
        }
    }
}

#[async_trait::async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing a search string. Tries an exact match first, \
         then falls back to whitespace-tolerant matching."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "search": { "type": "string" },
                "replace": { "type": "string" }
            },
            "required": ["path", "search", "replace"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(path) = args["path"].as_str() else {
            return ToolResult::error("Missing required parameter: path");
        };
        let Some(search) = args["search"].as_str() else {
            return ToolResult::error("Missing required parameter: search");
        };
        let Some(replace) = args["replace"].as_str() else {
            return ToolResult::error("Missing required parameter: replace");
        };

        let absolute = match sanitize(
            &self.workspace_root,
            path,
            Operation::Write,
            &self.allowed_write_dirs,
        ) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let content = match tokio::fs::read_to_string(&absolute).await {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("failed to read {path}: {e}")),
        };

        match apply_one_edit(&content, search, replace) {
            Some(updated) => match tokio::fs::write(&absolute, updated).await {
                Ok(()) => ToolResult::text(format!("edited {path}")),
                Err(e) => ToolResult::error(format!("failed to write {path}: {e}")),
            },
            None => ToolResult::error(format!("search text not found in {path}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn edit_applies_fuzzy_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "  return x + y ;\n").unwrap();

        let tool = EditTool::new(dir.path(), vec!["src".into()]);
        let result = tool
            .execute(json!({
                "path": "src/a.ts",
                "search": "return x + y;",
                "replace": "return x + y + 1;"
            }))
            .await;
        assert!(!result.is_error());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "  return x + y + 1;\n"
        );
    }

    #[tokio::test]
    async fn edit_reports_missing_search_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "const x = 1;\n").unwrap();

        let tool = EditTool::new(dir.path(), vec!["src".into()]);
        let result = tool
            .execute(json!({"path": "src/a.ts", "search": "nope", "replace": "x"}))
            .await;
        assert!(result.is_error());
    }
}
