//! Read tool — sanitized file read for the tool-using Executor variant.

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::registry::{Tool, ToolResult};
use crate::sanitize::{sanitize, Operation};

pub struct ReadTool {
    workspace_root: PathBuf,
}

impl ReadTool {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative file path" }
            },
            "required": ["path"]
        })
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(path) = args["path"].as_str() else {
            return ToolResult::error("Missing required parameter: path");
        };
        let absolute = match sanitize(&self.workspace_root, path, Operation::Read, &[]) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match tokio::fs::read_to_string(&absolute).await {
            Ok(content) => ToolResult::text(content),
            Err(e) => ToolResult::error(format!("failed to read {path}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_file_within_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "hello").unwrap();
        let tool = ReadTool::new(dir.path());
        let result = tool.execute(json!({"path": "a.ts"})).await;
        assert_eq!(result.to_content_string(), "hello");
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadTool::new(dir.path());
        let result = tool.execute(json!({"path": "../secret"})).await;
        assert!(result.is_error());
    }
}
