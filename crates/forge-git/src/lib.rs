//! Git Manager — a hard allowlist over git subcommands.
//!
//! Every operation below builds its own fixed argument vector; there is no
//! general "run an arbitrary git command" entry point, unlike a bash tool.
//! Branch names are validated against the allowed regex before any command
//! that would create or target one is issued.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use forge_core::error::{ForgeError, Result};

/// Subcommands this manager will issue. Nothing outside this set (and
/// nothing outside the fixed argument shapes each method below builds) ever
/// reaches a spawned `git` process.
const ALLOWED_SUBCOMMANDS: &[&str] = &[
    "clone", "pull", "checkout", "branch", "add", "commit", "diff", "log", "push", "status",
    "rev-parse", "symbolic-ref",
];

/// Arguments that are never permitted anywhere in a command line this
/// manager builds, even if a caller somehow got one of the allowed
/// subcommands to accept it.
const FORBIDDEN_ARGS: &[&str] = &[
    "--force",
    "-f",
    "--hard",
    "--amend",
    "--delete",
    "-D",
    "--mirror",
    "--all",
    "--tags",
];

fn branch_regex() -> Regex {
    Regex::new(r"^forge/(task-[0-9a-f]{8}|auto-\d{8}-\d{6})$").unwrap()
}

/// Validate a branch name against the only two shapes this engine produces.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if branch_regex().is_match(name) {
        Ok(())
    } else {
        Err(ForgeError::git_denied(format!(
            "branch name '{name}' does not match forge/task-<8hex> or forge/auto-<YYYYMMDD>-<HHmmss>"
        )))
    }
}

/// Reject subcommands or argument tokens outside the allowlist, regardless
/// of who is calling — defense in depth for the fixed-arg-vector methods
/// below, since every one of them assembles its own argv rather than
/// accepting caller-supplied flags.
fn check_allowlist(args: &[&str]) -> Result<()> {
    let Some(subcommand) = args.first() else {
        return Err(ForgeError::git_denied("empty git command"));
    };
    if !ALLOWED_SUBCOMMANDS.contains(subcommand) {
        return Err(ForgeError::git_denied(format!(
            "git subcommand '{subcommand}' is not in the allowlist"
        )));
    }
    for arg in args {
        if FORBIDDEN_ARGS.contains(arg) || arg.starts_with("--force") {
            return Err(ForgeError::git_denied(format!(
                "argument '{arg}' is forbidden"
            )));
        }
        if *subcommand != "push" && (*arg == "rebase" || *arg == "remote" || *arg == "tag" || *arg == "fetch") {
            return Err(ForgeError::git_denied(format!(
                "argument '{arg}' is forbidden"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub subject: String,
}

pub struct GitManager {
    timeout: Duration,
}

impl Default for GitManager {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl GitManager {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        check_allowlist(args)?;

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("git")
                .args(args)
                .current_dir(dir)
                .env("HUSKY", "0")
                .env("GIT_TERMINAL_PROMPT", "0")
                .output(),
        )
        .await
        .map_err(|_| ForgeError::Timeout(self.timeout))?
        .map_err(ForgeError::Io)?;

        if !output.status.success() {
            return Err(ForgeError::SubprocessFailed {
                command: format!("git {}", args.join(" ")),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// `git clone <remote> <dest>`.
    pub async fn clone(&self, remote: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy().to_string();
        self.run(
            dest.parent().unwrap_or(Path::new(".")),
            &["clone", remote, &dest_str],
        )
        .await?;
        Ok(())
    }

    /// `git clone --local --no-hardlinks <base> <dest>`. Used to create a
    /// disjoint per-task working copy from the cached `.base` clone without
    /// a linked worktree's shared-object coupling back to `.base`'s index.
    pub async fn local_clone(&self, base: &Path, dest: &Path) -> Result<()> {
        let base_str = base.to_string_lossy().to_string();
        let dest_str = dest.to_string_lossy().to_string();
        self.run(
            dest.parent().unwrap_or(Path::new(".")),
            &["clone", "--local", "--no-hardlinks", &base_str, &dest_str],
        )
        .await?;
        Ok(())
    }

    /// `git pull` in `dir`. Failure is the caller's to handle — the
    /// Workspace Manager treats a failed pull as "keep the stale base".
    pub async fn pull(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["pull"]).await
    }

    pub async fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["checkout", branch]).await?;
        Ok(())
    }

    pub async fn switch_to_base(&self, dir: &Path, base_branch: &str) -> Result<()> {
        self.checkout(dir, base_branch).await
    }

    pub async fn create_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        self.run(dir, &["checkout", "-b", branch]).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        // intentionally -d (safe delete), never -D (force) — -D is denylisted above.
        self.run(dir, &["branch", "-d", branch]).await?;
        Ok(())
    }

    pub async fn stage(&self, dir: &Path, paths: &[String]) -> Result<()> {
        let mut args: Vec<&str> = vec!["add"];
        args.extend(paths.iter().map(String::as_str));
        self.run(dir, &args).await?;
        Ok(())
    }

    /// Commit staged changes. The message is normalized: truncated to 200
    /// characters, newlines stripped, before it ever reaches the argv.
    pub async fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        let normalized = normalize_commit_message(message);
        self.run(dir, &["commit", "-m", &normalized]).await?;
        self.run(dir, &["rev-parse", "HEAD"]).await
    }

    pub async fn diff(&self, dir: &Path, staged: bool) -> Result<String> {
        if staged {
            self.run(dir, &["diff", "--cached"]).await
        } else {
            self.run(dir, &["diff"]).await
        }
    }

    pub async fn log(&self, dir: &Path, range: &str, limit: u32) -> Result<Vec<CommitInfo>> {
        let limit_arg = format!("-{limit}");
        let format_arg = "--pretty=format:%H%x09%s".to_string();
        let raw = self
            .run(dir, &["log", &limit_arg, &format_arg, range])
            .await?;
        Ok(raw
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(2, '\t');
                let hash = parts.next()?.to_string();
                let subject = parts.next().unwrap_or_default().to_string();
                Some(CommitInfo { hash, subject })
            })
            .collect())
    }

    /// Push `branch` to `remote_with_creds` (a URL with credentials injected
    /// by the caller for the duration of this call only). The URL is never
    /// logged or placed in an `ExecutionEvent`; only the branch name is.
    pub async fn push_to(&self, dir: &Path, remote_with_creds: &str, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        self.run(dir, &["push", remote_with_creds, branch]).await?;
        Ok(())
    }
}

fn normalize_commit_message(message: &str) -> String {
    let single_line: String = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() > 200 {
        single_line.chars().take(200).collect()
    } else {
        single_line
    }
}

pub fn build_task_branch_name(task_short_id: &str) -> String {
    format!("forge/task-{task_short_id}")
}

pub fn build_auto_branch_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("forge/auto-{}", now.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_task_branch() {
        assert!(validate_branch_name("forge/task-deadbeef").is_ok());
    }

    #[test]
    fn accepts_valid_auto_branch() {
        assert!(validate_branch_name("forge/auto-20260728-153045").is_ok());
    }

    #[test]
    fn rejects_main() {
        assert!(validate_branch_name("main").is_err());
    }

    #[test]
    fn rejects_non_hex_suffix() {
        assert!(validate_branch_name("forge/task-zzzzzzzz").is_err());
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(validate_branch_name("feature/task-deadbeef").is_err());
    }

    #[test]
    fn allowlist_rejects_unknown_subcommand() {
        assert!(check_allowlist(&["rebase", "-i"]).is_err());
    }

    #[test]
    fn allowlist_rejects_force_push() {
        assert!(check_allowlist(&["push", "origin", "main", "--force"]).is_err());
    }

    #[test]
    fn allowlist_rejects_hard_reset_style_args() {
        assert!(check_allowlist(&["checkout", "--hard"]).is_err());
    }

    #[test]
    fn allowlist_accepts_plain_commit() {
        assert!(check_allowlist(&["commit", "-m", "message"]).is_ok());
    }

    #[test]
    fn normalize_strips_newlines_and_truncates() {
        let long = "a".repeat(250);
        let msg = format!("line one\nline two {long}");
        let normalized = normalize_commit_message(&msg);
        assert!(!normalized.contains('\n'));
        assert!(normalized.chars().count() <= 200);
    }

    #[test]
    fn build_task_branch_name_matches_allowed_pattern() {
        let name = build_task_branch_name("deadbeef");
        assert!(validate_branch_name(&name).is_ok());
    }
}
