//! Bounded subprocess invocation shared by the Validator and the bash tool:
//! fixed argument arrays (never shell-interpolated), a hard timeout, and
//! truncated/noise-stripped output.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use forge_core::error::{ForgeError, Result};

const MAX_OUTPUT_CHARS: usize = 30_000;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args...` in `dir` with environment scrubbed of prompt and
/// terminal flags, bounded by `timeout`. Output is truncated and stripped
/// of known noise lines (e.g. `npm WARN ...`).
pub async fn run_bounded(
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Duration,
) -> Result<CommandOutput> {
    let output = tokio::time::timeout(
        timeout,
        Command::new(program)
            .args(args)
            .current_dir(dir)
            .env("HUSKY", "0")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("CI", "1")
            .output(),
    )
    .await
    .map_err(|_| ForgeError::Timeout(timeout))?
    .map_err(ForgeError::Io)?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: strip_noise(&truncate(&String::from_utf8_lossy(&output.stdout))),
        stderr: strip_noise(&truncate(&String::from_utf8_lossy(&output.stderr))),
    })
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_OUTPUT_CHARS {
        let head: String = s.chars().take(MAX_OUTPUT_CHARS).collect();
        format!("{head}\n... [truncated, {} total chars]", s.chars().count())
    } else {
        s.to_string()
    }
}

const NOISE_PREFIXES: &[&str] = &["npm WARN", "npm warn", "yarn warn", "pnpm WARN"];

fn strip_noise(s: &str) -> String {
    s.lines()
        .filter(|line| !NOISE_PREFIXES.iter().any(|p| line.trim_start().starts_with(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_noise_drops_npm_warn_lines() {
        let input = "npm WARN deprecated thing\nreal output\nnpm WARN another\n";
        assert_eq!(strip_noise(input), "real output");
    }

    #[test]
    fn truncate_leaves_short_output_untouched() {
        assert_eq!(truncate("hello"), "hello");
    }

    #[tokio::test]
    async fn run_bounded_captures_exit_status() {
        let dir = std::env::temp_dir();
        let output = run_bounded("true", &[], &dir, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.success);
    }

    #[tokio::test]
    async fn run_bounded_times_out() {
        let dir = std::env::temp_dir();
        let result = run_bounded("sleep", &["5"], &dir, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ForgeError::Timeout(_))));
    }
}
