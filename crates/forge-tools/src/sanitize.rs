//! Path Sanitizer (component A).
//!
//! `sanitize(workspace_root, relative_path)` is the single gate every
//! workspace-relative path must pass before it is read or written. Rules:
//!
//! 1. reject absolute inputs
//! 2. reject `..` components after normalization
//! 3. reject a first segment in the denylist
//! 4. reject `.env*`, `.git/*`, and any path that escapes the workspace
//!    root after symlink resolution
//! 5. for writes, additionally require the first segment to be in the
//!    caller-supplied allowed-write-directories set

use std::path::{Component, Path, PathBuf};

use forge_core::error::{ForgeError, Result};

const DENYLIST: &[&str] = &[
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
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Validate `relative_path` against `workspace_root` and return the
/// resolved absolute path. `allowed_write_dirs` is consulted only for
/// `Operation::Write`.
pub fn sanitize(
    workspace_root: &Path,
    relative_path: &str,
    operation: Operation,
    allowed_write_dirs: &[String],
) -> Result<PathBuf> {
    let candidate = Path::new(relative_path);

    if candidate.is_absolute() {
        return Err(ForgeError::path_rejected(format!(
            "absolute path not allowed: {relative_path}"
        )));
    }

    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::ParentDir => {
                return Err(ForgeError::path_rejected(format!(
                    "path traversal ('..') not allowed: {relative_path}"
                )));
            }
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => {
                return Err(ForgeError::path_rejected(format!(
                    "absolute path not allowed: {relative_path}"
                )));
            }
        }
    }

    let Some(first) = normalized.components().next() else {
        return Err(ForgeError::path_rejected("empty path"));
    };
    let first_str = first.as_os_str().to_string_lossy().to_string();

    if DENYLIST.contains(&first_str.as_str()) {
        return Err(ForgeError::path_rejected(format!(
            "'{first_str}' is a denied directory"
        )));
    }

    let file_name = normalized
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if file_name.starts_with(".env") {
        return Err(ForgeError::path_rejected(".env files are not accessible"));
    }
    if normalized
        .components()
        .any(|c| c.as_os_str() == ".git")
    {
        return Err(ForgeError::path_rejected(".git contents are not accessible"));
    }

    if operation == Operation::Write && !allowed_write_dirs.is_empty() {
        if !allowed_write_dirs.iter().any(|d| d == &first_str) {
            return Err(ForgeError::path_rejected(format!(
                "writes to '{first_str}' are not permitted for this project"
            )));
        }
    }

    let absolute = workspace_root.join(&normalized);

    // Escape-under-symlinks check: canonicalize as much of the path as
    // exists, then confirm it is still rooted under the workspace. A path
    // whose leaf doesn't exist yet (a file about to be created) is checked
    // by canonicalizing its existing ancestor instead.
    let root_canonical = workspace_root
        .canonicalize()
        .map_err(|e| ForgeError::path_rejected(format!("workspace root invalid: {e}")))?;

    let mut probe = absolute.clone();
    let existing = loop {
        if probe.exists() {
            break probe.canonicalize().map_err(ForgeError::Io)?;
        }
        match probe.parent() {
            Some(parent) if parent != probe => probe = parent.to_path_buf(),
            _ => break root_canonical.clone(),
        }
    };

    if !existing.starts_with(&root_canonical) {
        return Err(ForgeError::path_rejected(format!(
            "path escapes workspace root after symlink resolution: {relative_path}"
        )));
    }

    Ok(absolute)
}
