//! Output Parser — component G. Extracts the largest balanced `{...}`
//! block from raw LLM text, tolerating markdown fences and surrounding
//! prose, then schema-validates it into a typed DTO. Grounded on the same
//! "tolerate surrounding noise, validate against a schema, degrade to a
//! safe default" posture a tolerant frame parser takes toward malformed
//! envelopes — the brace-matching scanner itself is new, since the
//! the Anthropic provider always hands back already-structured tool calls.

use forge_core::types::{ChangeAction, FileChange, Plan};
use serde::{Deserialize, Serialize};

/// Scan `text` for the largest top-level balanced `{...}` span, honoring
/// string literals and escapes so braces inside quoted strings don't throw
/// off the count. Returns `None` if no balanced span exists.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = find_matching_brace(bytes, i) {
                if best.map(|(s, e)| e - s < end - i).unwrap_or(true) {
                    best = Some((i, end));
                }
            }
        }
        i += 1;
    }

    best.map(|(s, e)| &text[s..=e])
}

fn find_matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Parse a planning-phase response. On any extraction or schema failure,
/// returns a fallback plan that echoes the task so the pipeline can still
/// terminate cleanly instead of aborting the whole turn.
pub fn parse_planning_output(text: &str, task: &str) -> Plan {
    extract_json_block(text)
        .and_then(|block| serde_json::from_str::<Plan>(block).ok())
        .unwrap_or_else(|| Plan {
            files_to_read: Vec::new(),
            files_to_modify: Vec::new(),
            files_to_create: Vec::new(),
            approach: format!("<echo of task>: {task}"),
        })
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub description: String,
    pub risk: u8,
    pub rollback: String,
    pub files: Vec<FileChange>,
}

impl ExecutionOutput {
    fn is_well_formed(&self) -> bool {
        (1..=5).contains(&self.risk)
            && !self.files.is_empty()
            && self.files.iter().all(FileChange::is_well_formed)
            && self.files.iter().all(|f| match f.action {
                ChangeAction::Create => f.content.is_some(),
                ChangeAction::Modify => f.content.is_some() || f.edits.is_some(),
            })
    }
}

/// Parse an execution-phase response into a typed `ExecutionOutput`.
/// Returns `None` on extraction failure, JSON-shape mismatch, or a
/// structurally invalid payload (out-of-range risk, empty file list, a
/// `FileChange` missing both content and edits).
pub fn parse_execution_output(text: &str) -> Option<ExecutionOutput> {
    let block = extract_json_block(text)?;
    let output: ExecutionOutput = serde_json::from_str(block).ok()?;
    if output.is_well_formed() {
        Some(output)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_block_past_markdown_fence_and_prose() {
        let text = "Sure, here you go:\n```json\n{\"a\": 1, \"b\": {\"c\": 2}}\n```\nHope that helps!";
        let block = extract_json_block(text).unwrap();
        assert_eq!(block, r#"{"a": 1, "b": {"c": 2}}"#);
    }

    #[test]
    fn ignores_braces_inside_string_literals() {
        let text = r#"{"approach": "handle { and } inside strings", "files_to_read": []}"#;
        let block = extract_json_block(text).unwrap();
        assert_eq!(block, text);
    }

    #[test]
    fn picks_the_largest_balanced_block_when_several_exist() {
        let text = r#"noise {"x":1} then the real one {"files_to_read":["a.ts"],"files_to_modify":[],"files_to_create":[],"approach":"do it"}"#;
        let block = extract_json_block(text).unwrap();
        assert!(block.contains("files_to_read"));
    }

    #[test]
    fn planning_falls_back_to_echo_on_malformed_json() {
        let plan = parse_planning_output("not json at all", "fix the bug");
        assert!(plan.is_empty());
        assert!(plan.approach.contains("fix the bug"));
    }

    #[test]
    fn planning_parses_well_formed_json() {
        let text = r#"{"files_to_read":["a.ts"],"files_to_modify":["b.ts"],"files_to_create":[],"approach":"edit b.ts"}"#;
        let plan = parse_planning_output(text, "unused");
        assert_eq!(plan.files_to_modify, vec!["b.ts".to_string()]);
        assert_eq!(plan.approach, "edit b.ts");
    }

    #[test]
    fn execution_output_rejects_out_of_range_risk() {
        let text = r#"{"description":"d","risk":9,"rollback":"r","files":[{"path":"a.ts","action":"create","content":"x"}]}"#;
        assert!(parse_execution_output(text).is_none());
    }

    #[test]
    fn execution_output_rejects_modify_without_content_or_edits() {
        let text = r#"{"description":"d","risk":2,"rollback":"r","files":[{"path":"a.ts","action":"modify"}]}"#;
        assert!(parse_execution_output(text).is_none());
    }

    #[test]
    fn execution_output_accepts_well_formed_payload() {
        let text = r#"{"description":"add feature","risk":3,"rollback":"git revert","files":[{"path":"a.ts","action":"modify","edits":[{"search":"old","replace":"new"}]}]}"#;
        let output = parse_execution_output(text).unwrap();
        assert_eq!(output.risk, 3);
        assert_eq!(output.files.len(), 1);
    }
}
