//! Change Applier (component H).
//!
//! `apply(files, workspace)` writes or search-replaces each `FileChange`
//! against the workspace, backing up every touched file first so a failure
//! partway through can be rolled back to a byte-identical pre-run state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use forge_core::{ChangeAction, FileChange};

use crate::sanitize::{sanitize, Operation};

#[derive(Debug, Default)]
pub struct ApplyResult {
    pub success: bool,
    pub applied_files: Vec<String>,
    pub failed_file: Option<String>,
    pub failed_edit_index: Option<usize>,
    pub error: Option<String>,
}

impl ApplyResult {
    fn ok(applied_files: Vec<String>) -> Self {
        Self {
            success: true,
            applied_files,
            ..Default::default()
        }
    }

    fn failure(
        file: String,
        edit_index: Option<usize>,
        error: String,
        applied_so_far: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            applied_files: applied_so_far,
            failed_file: Some(file),
            failed_edit_index: edit_index,
            error: Some(error),
        }
    }
}

struct Backup {
    path: PathBuf,
    existed: bool,
    original: Option<String>,
}

/// Apply every `FileChange` in order. On the first failure, all files
/// touched during this call (including the failing one, if it was
/// partially written) are restored from backup; files that did not exist
/// before this call are deleted.
pub fn apply(
    files: &[FileChange],
    workspace: &Path,
    allowed_write_dirs: &[String],
) -> ApplyResult {
    let mut backups: HashMap<String, Backup> = HashMap::new();
    let mut applied = Vec::new();

    for change in files {
        let absolute = match sanitize(workspace, &change.path, Operation::Write, allowed_write_dirs)
        {
            Ok(p) => p,
            Err(e) => {
                rollback(&backups);
                return ApplyResult::failure(change.path.clone(), None, e.to_string(), applied);
            }
        };

        if !backups.contains_key(&change.path) {
            backups.insert(change.path.clone(), capture_backup(&absolute));
        }

        let result = match change.action {
            ChangeAction::Create => apply_create(&absolute, change),
            ChangeAction::Modify => apply_modify(&absolute, change),
        };

        match result {
            Ok(()) => applied.push(change.path.clone()),
            Err((edit_index, message)) => {
                rollback(&backups);
                return ApplyResult::failure(change.path.clone(), edit_index, message, applied);
            }
        }
    }

    ApplyResult::ok(applied)
}

fn capture_backup(path: &Path) -> Backup {
    if path.exists() {
        Backup {
            path: path.to_path_buf(),
            existed: true,
            original: std::fs::read_to_string(path).ok(),
        }
    } else {
        Backup {
            path: path.to_path_buf(),
            existed: false,
            original: None,
        }
    }
}

fn rollback(backups: &HashMap<String, Backup>) {
    for backup in backups.values() {
        if backup.existed {
            if let Some(original) = &backup.original {
                let _ = std::fs::write(&backup.path, original);
            }
        } else {
            let _ = std::fs::remove_file(&backup.path);
        }
    }
}

fn apply_create(absolute: &Path, change: &FileChange) -> Result<(), (Option<usize>, String)> {
    let content = change
        .content
        .as_ref()
        .ok_or_else(|| (None, "create action requires content".to_string()))?;
    if let Some(parent) = absolute.parent() {
        std::fs::create_dir_all(parent).map_err(|e| (None, e.to_string()))?;
    }
    std::fs::write(absolute, content).map_err(|e| (None, e.to_string()))
}

fn apply_modify(absolute: &Path, change: &FileChange) -> Result<(), (Option<usize>, String)> {
    if let Some(edits) = &change.edits {
        let mut content = std::fs::read_to_string(absolute).map_err(|e| (None, e.to_string()))?;
        for (index, edit) in edits.iter().enumerate() {
            content = apply_one_edit(&content, &edit.search, &edit.replace)
                .ok_or_else(|| (Some(index), "search text not found".to_string()))?;
        }
        std::fs::write(absolute, content).map_err(|e| (None, e.to_string()))
    } else if let Some(content) = &change.content {
        std::fs::write(absolute, content).map_err(|e| (None, e.to_string()))
    } else {
        Err((None, "modify action requires edits or content".to_string()))
    }
}

/// Attempt, in order, and stop at the first hit:
/// 1. exact substring match
/// 2. multi-line trimmed match — slide a window of trimmed search lines
///    over trimmed content lines; replacement spans the full raw lines
/// 3. single-line trimmed match, ignoring internal whitespace differences
/// 4. substring match against the trimmed line, also whitespace-tolerant
pub fn apply_one_edit(content: &str, search: &str, replace: &str) -> Option<String> {
    if content.contains(search) {
        return Some(content.replacen(search, replace, 1));
    }

    if let Some(result) = multiline_trimmed_match(content, search, replace) {
        return Some(result);
    }

    if let Some(result) = single_line_trimmed_match(content, search, replace) {
        return Some(result);
    }

    substring_against_trimmed_line(content, search, replace)
}

fn multiline_trimmed_match(content: &str, search: &str, replace: &str) -> Option<String> {
    let search_lines: Vec<&str> = search
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if search_lines.len() < 2 {
        return None;
    }

    let content_lines: Vec<&str> = content.lines().collect();
    let window = search_lines.len();

    for start in 0..=content_lines.len().saturating_sub(window) {
        let candidate_trimmed: Vec<&str> = content_lines[start..start + window]
            .iter()
            .map(|l| l.trim())
            .collect();
        if candidate_trimmed == search_lines {
            let mut out_lines: Vec<&str> = Vec::with_capacity(content_lines.len());
            out_lines.extend_from_slice(&content_lines[..start]);
            let replace_lines: Vec<&str> = replace.lines().collect();
            out_lines.extend_from_slice(&replace_lines);
            out_lines.extend_from_slice(&content_lines[start + window..]);
            return Some(join_preserving_trailing_newline(content, &out_lines));
        }
    }
    None
}

/// Strip every whitespace character, for comparing a search string against
/// a content line that differs only in spacing (a missing space before a
/// semicolon, a tab instead of two spaces, and so on).
fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect()
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn single_line_trimmed_match(content: &str, search: &str, replace: &str) -> Option<String> {
    let search_trimmed = search.trim();
    if search_trimmed.is_empty() || search.lines().count() > 1 {
        return None;
    }
    let search_normalized = normalize_ws(search_trimmed);

    let content_lines: Vec<&str> = content.lines().collect();
    let mut matches = content_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| normalize_ws(line) == search_normalized);

    let (index, line) = matches.next()?;
    if matches.next().is_some() {
        // ambiguous; caller's exact-match stage would have found a unique
        // hit already if one existed unambiguously, so treat as not found
        // rather than guessing which occurrence was intended.
        return None;
    }

    let leading_ws = leading_whitespace(line);
    let mut out_lines: Vec<String> = content_lines.iter().map(|s| s.to_string()).collect();
    out_lines[index] = format!("{leading_ws}{replace}");
    let owned: Vec<&str> = out_lines.iter().map(String::as_str).collect();
    Some(join_preserving_trailing_newline(content, &owned))
}

/// Build a regex that matches `search` against a line even when the line's
/// internal spacing differs (extra space, missing space, a tab), by
/// dropping whitespace from `search` entirely and allowing optional
/// whitespace between every character that remains.
fn whitespace_tolerant_pattern(search: &str) -> String {
    search
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| regex::escape(&c.to_string()))
        .collect::<Vec<_>>()
        .join(r"\s*")
}

fn substring_against_trimmed_line(content: &str, search: &str, replace: &str) -> Option<String> {
    if search.lines().count() > 1 {
        return None;
    }
    let pattern = whitespace_tolerant_pattern(search.trim());
    if pattern.is_empty() {
        return None;
    }
    let re = regex::Regex::new(&pattern).ok()?;

    let content_lines: Vec<&str> = content.lines().collect();
    let mut matches = content_lines
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(i, line)| re.find(line.trim()).map(|m| (i, line, m)));

    let (index, line, m) = matches.next()?;
    if matches.next().is_some() {
        return None;
    }

    let trimmed = line.trim();
    let replaced_trimmed = format!("{}{}{}", &trimmed[..m.start()], replace, &trimmed[m.end()..]);
    let leading_ws = leading_whitespace(line);
    let mut out_lines: Vec<String> = content_lines.iter().map(|s| s.to_string()).collect();
    out_lines[index] = format!("{leading_ws}{replaced_trimmed}");
    let owned: Vec<&str> = out_lines.iter().map(String::as_str).collect();
    Some(join_preserving_trailing_newline(content, &owned))
}

fn join_preserving_trailing_newline(original: &str, lines: &[&str]) -> String {
    let joined = lines.join("\n");
    if original.ends_with('\n') {
        format!("{joined}\n")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::FileEdit;

    fn workspace() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "forge-apply-test-{}-{}",
            std::process::id(),
            uuid_like()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn uuid_like() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    #[test]
    fn exact_match_applies() {
        let result = apply_one_edit("const x = 1;\n", "const x = 1;", "const x = 2;");
        assert_eq!(result.unwrap(), "const x = 2;\n");
    }

    #[test]
    fn single_line_trimmed_match_preserves_indentation() {
        let content = "function f() {\n  return x + y ;\n}\n";
        let result = apply_one_edit(content, "return x + y;", "return x + y + 1;");
        assert_eq!(result.unwrap(), "function f() {\n  return x + y + 1;\n}\n");
    }

    #[test]
    fn multiline_trimmed_match_spans_block() {
        let content = "fn a() {\n    let a = 1;\n    let b = 2;\n}\n";
        let search = "let a = 1;\nlet b = 2;";
        let replace = "let ab = 3;";
        let result = apply_one_edit(content, search, replace);
        assert_eq!(result.unwrap(), "fn a() {\n    let ab = 3;\n}\n");
    }

    #[test]
    fn substring_against_trimmed_line_matches() {
        let content = "  const total = price * qty;\n";
        let result = apply_one_edit(content, "price * qty", "price * qty * taxRate");
        assert_eq!(
            result.unwrap(),
            "  const total = price * qty * taxRate;\n"
        );
    }

    #[test]
    fn no_match_returns_none() {
        assert!(apply_one_edit("abc\n", "xyz", "qqq").is_none());
    }

    #[test]
    fn apply_create_writes_new_file() {
        let ws = workspace();
        let change = FileChange {
            path: "src/new.ts".into(),
            action: ChangeAction::Create,
            content: Some("export const x = 1;\n".into()),
            edits: None,
        };
        let result = apply(&[change], &ws, &["src".into()]);
        assert!(result.success);
        assert_eq!(
            std::fs::read_to_string(ws.join("src/new.ts")).unwrap(),
            "export const x = 1;\n"
        );
    }

    #[test]
    fn apply_modify_rolls_back_on_failed_edit() {
        let ws = workspace();
        std::fs::create_dir_all(ws.join("src")).unwrap();
        std::fs::write(ws.join("src/a.ts"), "const x = 1;\n").unwrap();

        let change = FileChange {
            path: "src/a.ts".into(),
            action: ChangeAction::Modify,
            content: None,
            edits: Some(vec![FileEdit::new("does not exist", "replacement")]),
        };
        let result = apply(&[change], &ws, &["src".into()]);
        assert!(!result.success);
        assert_eq!(result.failed_edit_index, Some(0));
        assert_eq!(
            std::fs::read_to_string(ws.join("src/a.ts")).unwrap(),
            "const x = 1;\n"
        );
    }

    #[test]
    fn apply_deletes_newly_created_file_on_later_failure() {
        let ws = workspace();
        let create = FileChange {
            path: "src/new.ts".into(),
            action: ChangeAction::Create,
            content: Some("x".into()),
            edits: None,
        };
        let failing_modify = FileChange {
            path: "src/missing.ts".into(),
            action: ChangeAction::Modify,
            content: None,
            edits: Some(vec![FileEdit::new("anything", "x")]),
        };
        let result = apply(&[create, failing_modify], &ws, &["src".into()]);
        assert!(!result.success);
        assert!(!ws.join("src/new.ts").exists());
    }

    #[test]
    fn apply_rejects_path_outside_allowed_write_dirs() {
        let ws = workspace();
        let change = FileChange {
            path: "scripts/hack.sh".into(),
            action: ChangeAction::Create,
            content: Some("#!/bin/sh".into()),
            edits: None,
        };
        let result = apply(&[change], &ws, &["src".into()]);
        assert!(!result.success);
        assert!(!ws.join("scripts/hack.sh").exists());
    }
}
