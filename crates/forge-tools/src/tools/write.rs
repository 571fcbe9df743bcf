//! Write tool — sanitized full-file write for the tool-using Executor
//! variant. Unlike the Change Applier, this writes immediately with no
//! backup/rollback bookkeeping of its own — the agent loop that owns this
//! tool is expected to stage its final intent as `FileChange`s and let the
//! Correction Controller drive the real `apply()` call.

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::registry::{Tool, ToolResult};
use crate::sanitize::{sanitize, Operation};

pub struct WriteTool {
    workspace_root: PathBuf,
    allowed_write_dirs: Vec<String>,
}

impl WriteTool {
    pub fn new(workspace_root: impl Into<PathBuf>, allowed_write_dirs: Vec<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            allowed_write_dirs,
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write full contents to a file in the workspace, creating it if needed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(path) = args["path"].as_str() else {
            return ToolResult::error("Missing required parameter: path");
        };
        let Some(content) = args["content"].as_str() else {
            return ToolResult::error("Missing required parameter: content");
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
        if let Some(parent) = absolute.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(e.to_string());
            }
        }
        match tokio::fs::write(&absolute, content).await {
            Ok(()) => ToolResult::text(format!("wrote {path}")),
            Err(e) => ToolResult::error(format!("failed to write {path}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_within_allowed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteTool::new(dir.path(), vec!["src".into()]);
        let result = tool
            .execute(json!({"path": "src/a.ts", "content": "x"}))
            .await;
        assert!(!result.is_error());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "x"
        );
    }

    #[tokio::test]
    async fn rejects_write_outside_allowed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteTool::new(dir.path(), vec!["src".into()]);
        let result = tool
            .execute(json!({"path": "scripts/a.sh", "content": "x"}))
            .await;
        assert!(result.is_error());
    }
}
