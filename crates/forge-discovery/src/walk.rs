//! Directory walk — component D.1. Produces a denylist-filtered file list
//! and a human-readable tree string, bounded by depth, per-file size, and
//! total file count so a pathological monorepo can't blow the discovery
//! budget.

use std::path::Path;

use walkdir::WalkDir;

use forge_core::Result;

pub const MAX_TREE_DEPTH: usize = 8;
pub const MAX_CONTENT_FILE_BYTES: u64 = 50_000;
pub const MAX_INDEXED_FILES: usize = 4_000;

const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".pnpm-store",
    "dist",
    "build",
    ".next",
    ".turbo",
    ".cache",
    "coverage",
    "sandbox",
    "target",
];

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WalkedFile {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct WalkResult {
    pub tree_string: String,
    pub files: Vec<WalkedFile>,
    pub total_files: usize,
    pub total_dirs: usize,
}

/// Walk `root`, skipping ignored directories, depth-limited, file-count
/// limited. Returns paths relative to `root`.
pub fn walk(root: &Path) -> Result<WalkResult> {
    let mut files = Vec::new();
    let mut total_dirs = 0usize;
    let mut tree_lines = Vec::new();

    for entry in WalkDir::new(root)
        .max_depth(MAX_TREE_DEPTH)
        .into_iter()
        .filter_entry(|e| {
            e.path() == root
                || !IGNORED_DIRS.contains(&e.file_name().to_string_lossy().as_ref())
        })
        .filter_map(|e| e.ok())
    {
        if entry.path() == root {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        let depth = relative.components().count();
        let indent = "  ".repeat(depth.saturating_sub(1));

        if entry.file_type().is_dir() {
            total_dirs += 1;
            tree_lines.push(format!("{indent}{}/", entry.file_name().to_string_lossy()));
            continue;
        }

        if files.len() >= MAX_INDEXED_FILES {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        tree_lines.push(format!("{indent}{}", entry.file_name().to_string_lossy()));
        files.push(WalkedFile {
            path: relative_str,
            size,
            is_dir: false,
        });
    }

    let total_files = files.len();
    Ok(WalkResult {
        tree_string: tree_lines.join("\n"),
        files,
        total_files,
        total_dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "x").unwrap();

        let result = walk(dir.path()).unwrap();
        assert!(result.files.iter().any(|f| f.path == "src/index.ts"));
        assert!(!result.files.iter().any(|f| f.path.contains("node_modules")));
    }

    #[test]
    fn walk_counts_directories_separately_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/c.ts"), "x").unwrap();

        let result = walk(dir.path()).unwrap();
        assert_eq!(result.total_files, 1);
        assert_eq!(result.total_dirs, 2);
    }
}
