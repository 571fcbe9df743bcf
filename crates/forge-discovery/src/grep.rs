//! Content grep — component D.4. A single `kw1|kw2|...` pattern across
//! indexable files, preferring an external `rg` binary and falling back to
//! a bounded manual scan when it isn't on `PATH`.

use std::path::Path;

use regex::Regex;
use tokio::process::Command;

use crate::index::is_indexable;
use crate::walk::{WalkedFile, MAX_CONTENT_FILE_BYTES};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GrepMatch {
    pub path: String,
    pub match_count: usize,
    pub first_lines: Vec<String>,
}

/// Join keywords into a single alternation pattern, e.g. `kw1|kw2|kw3`.
pub fn build_pattern(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|")
}

pub async fn content_grep(
    root: &Path,
    files: &[WalkedFile],
    keywords: &[String],
) -> Vec<GrepMatch> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let pattern = build_pattern(keywords);

    match run_ripgrep(root, &pattern).await {
        Some(matches) => matches,
        None => manual_scan(root, files, &pattern),
    }
}

async fn run_ripgrep(root: &Path, pattern: &str) -> Option<Vec<GrepMatch>> {
    let output = Command::new("rg")
        .args(["--count-matches", "--no-heading", "--ignore-case", pattern])
        .current_dir(root)
        .output()
        .await
        .ok()?;

    // rg exits 1 when there are no matches; both 0 and 1 are "ran
    // successfully", anything else (notably 127 "not found") means fall
    // back to the manual scan.
    let code = output.status.code().unwrap_or(-1);
    if code != 0 && code != 1 {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut matches = Vec::new();
    for line in stdout.lines() {
        let Some((path, count)) = line.rsplit_once(':') else {
            continue;
        };
        let Ok(count) = count.parse::<usize>() else {
            continue;
        };
        matches.push(GrepMatch {
            path: path.to_string(),
            match_count: count,
            first_lines: Vec::new(),
        });
    }
    Some(matches)
}

fn manual_scan(root: &Path, files: &[WalkedFile], pattern: &str) -> Vec<GrepMatch> {
    let Ok(regex) = Regex::new(&format!("(?i){pattern}")) else {
        return Vec::new();
    };

    let mut matches = Vec::new();
    for file in files {
        if !is_indexable(&file.path) || file.size > MAX_CONTENT_FILE_BYTES {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(root.join(&file.path)) else {
            continue;
        };
        let count = regex.find_iter(&content).count();
        if count == 0 {
            continue;
        }
        let first_lines = content
            .lines()
            .filter(|l| regex.is_match(l))
            .take(3)
            .map(str::to_string)
            .collect();
        matches.push(GrepMatch {
            path: file.path.clone(),
            match_count: count,
            first_lines,
        });
    }
    matches
}
