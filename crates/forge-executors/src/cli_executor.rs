//! Subprocess CLI agent — the third `Executor` variant: a coding agent
//! that lives outside this process entirely (e.g. a vendored CLI tool)
//! and is driven by writing the phase prompt to its stdin and reading its
//! final answer back from stdout (`tokio::process::Command`, bounded
//! timeout, scrubbed environment) rather than a bespoke IPC protocol.
//!
//! Unlike `PromptExecutor`/`AgentExecutor`, this variant does not see the
//! provider's token counts — the subprocess owns its own LLM calls. Token
//! usage is estimated from input/output byte length (roughly 4 bytes per
//! token) purely so the budget and audit machinery still has a number to
//! accumulate; this is always an approximation and callers that need
//! exact accounting should prefer one of the in-process variants.

use std::path::PathBuf;
use std::time::Duration;

use forge_core::error::{ForgeError, Result};
use forge_core::types::{Plan, TokenUsage};
use forge_prompt::{
    build_correction_prompt, build_execution_prompt, build_planning_prompt, build_replan_prompt,
    parse_execution_output, parse_planning_output, ExecutionOutput,
};
use forge_tools::subprocess::run_bounded;

use crate::executor::{CorrectContext, ExecuteContext, Executor, PlanContext, ReplanContext};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Drives an external CLI coding agent as the `Executor` back-end. The
/// binary is invoked once per phase with the assembled system+user prompt
/// piped to its stdin and `--print`-style non-interactive output expected
/// on stdout; the caller supplies whatever flags make that true for the
/// binary in question.
pub struct CliExecutor {
    binary: PathBuf,
    args: Vec<String>,
    workspace: PathBuf,
    timeout: Duration,
}

impl CliExecutor {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args,
            workspace: workspace.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, system: &str, user: &str) -> Result<(String, TokenUsage)> {
        let prompt = format!("{system}\n\n{user}");
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let binary = self
            .binary
            .to_str()
            .ok_or_else(|| ForgeError::LlmFailed("cli executor binary path is not valid UTF-8".to_string()))?;

        let output = run_stdin(binary, &args, &self.workspace, &prompt, self.timeout).await?;

        if !output.success {
            return Err(ForgeError::LlmFailed(format!(
                "cli agent exited with a non-zero status: {}",
                output.stderr
            )));
        }

        let estimated = estimate_tokens(&prompt, &output.stdout);
        Ok((output.stdout, estimated))
    }
}

/// `forge_tools::subprocess::run_bounded` doesn't pipe stdin, so the CLI
/// variant needs its own bounded spawn — same timeout/scrub discipline,
/// plus a write to the child's stdin before awaiting its output.
async fn run_stdin(
    program: &str,
    args: &[&str],
    dir: &std::path::Path,
    stdin_payload: &str,
    timeout: Duration,
) -> Result<forge_tools::subprocess::CommandOutput> {
    use std::process::Stdio;
    use tokio::io::AsyncWriteExt;
    use tokio::process::Command;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ForgeError::Io)?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = stdin_payload.to_string();
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(ForgeError::Io)?;
    }

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ForgeError::Timeout(timeout))?
        .map_err(ForgeError::Io)?;

    Ok(forge_tools::subprocess::CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn estimate_tokens(input: &str, output: &str) -> TokenUsage {
    let input_tokens = (input.len() / 4).max(1) as u64;
    let output_tokens = (output.len() / 4).max(1) as u64;
    TokenUsage {
        input_tokens,
        output_tokens,
        total_tokens: input_tokens + output_tokens,
        cost_usd: None,
    }
}

#[async_trait::async_trait]
impl Executor for CliExecutor {
    async fn plan(&self, ctx: PlanContext<'_>) -> Result<(Plan, TokenUsage)> {
        let pair = build_planning_prompt(
            ctx.task,
            ctx.expected_output,
            ctx.discovery,
            ctx.allowed_write_dirs,
            ctx.research_context,
            ctx.goal_context,
        );
        let (text, tokens) = self.run(&pair.system, &pair.user).await?;
        Ok((parse_planning_output(&text, ctx.task), tokens))
    }

    async fn replan(&self, ctx: ReplanContext<'_>) -> Result<(Plan, TokenUsage)> {
        let pair = build_replan_prompt(ctx.task, ctx.expected_output, ctx.failed_files, ctx.discovery);
        let (text, tokens) = self.run(&pair.system, &pair.user).await?;
        Ok((parse_planning_output(&text, ctx.task), tokens))
    }

    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<(ExecutionOutput, TokenUsage)> {
        let pair = build_execution_prompt(
            ctx.task,
            ctx.plan,
            ctx.file_bodies,
            ctx.import_aliases,
            ctx.preexisting_lint_errors,
            ctx.prior_attempt_summaries,
            ctx.allowed_write_dirs,
        );
        let (text, tokens) = self.run(&pair.system, &pair.user).await?;
        let output = parse_execution_output(&text).ok_or_else(|| {
            ForgeError::ParseFailed("execution output did not match the expected schema".to_string())
        })?;
        Ok((output, tokens))
    }

    async fn correct(&self, ctx: CorrectContext<'_>) -> Result<(ExecutionOutput, TokenUsage)> {
        let pair = build_correction_prompt(
            ctx.previous_output,
            ctx.validation,
            ctx.type_snippets,
            ctx.offending_file_bodies,
            ctx.escalate,
        );
        let (text, tokens) = self.run(&pair.system, &pair.user).await?;
        let output = parse_execution_output(&text).ok_or_else(|| {
            ForgeError::ParseFailed("correction output did not match the expected schema".to_string())
        })?;
        Ok((output, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_never_zero_for_nonempty_text() {
        let tokens = estimate_tokens("hi", "there");
        assert!(tokens.input_tokens >= 1);
        assert!(tokens.output_tokens >= 1);
        assert_eq!(tokens.total_tokens, tokens.input_tokens + tokens.output_tokens);
    }

    #[tokio::test]
    async fn cli_executor_plans_from_a_stub_binary_that_echoes_stdin_as_json() {
        // `cat` echoes the piped prompt back, which isn't valid plan JSON,
        // so this exercises the "malformed reply" path the same way a
        // misbehaving external agent would.
        let dir = tempfile::tempdir().unwrap();
        let executor = CliExecutor::new("cat", vec![], dir.path());
        let task_id: forge_core::ids::TaskId = "t1".into();
        let discovery = forge_discovery::DiscoveryOutput::default();
        let (plan, _tokens) = executor
            .plan(PlanContext {
                task_id: &task_id,
                task: "fix the bug",
                expected_output: "bug fixed",
                discovery: &discovery,
                allowed_write_dirs: &[],
                research_context: None,
                goal_context: None,
            })
            .await
            .unwrap();
        // `cat` doesn't produce the requested JSON shape, so the parser's
        // graceful fallback plan (empty files, echoed task) applies.
        assert!(plan.files_to_modify.is_empty());
    }

    #[tokio::test]
    async fn cli_executor_reports_llm_failed_when_the_binary_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CliExecutor::new("/nonexistent/definitely-not-a-binary", vec![], dir.path());
        let task_id: forge_core::ids::TaskId = "t1".into();
        let discovery = forge_discovery::DiscoveryOutput::default();
        let result = executor
            .plan(PlanContext {
                task_id: &task_id,
                task: "fix the bug",
                expected_output: "bug fixed",
                discovery: &discovery,
                allowed_write_dirs: &[],
                research_context: None,
                goal_context: None,
            })
            .await;
        assert!(result.is_err());
    }
}
