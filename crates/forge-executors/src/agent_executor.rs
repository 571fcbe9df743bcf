//! Tool-using autonomous agent — the `Executor` variant that lets the
//! model inspect the workspace (read, glob) before committing to a final
//! answer. The wire protocol has no native tool-call envelope (see
//! `forge_llm::types::LlmRequest`), so tool calls are carried the same
//! way the final structured output is: a JSON object embedded in the
//! model's text, extracted with `forge_prompt::extract_json_block`. A
//! `{"tool": "...", "args": {...}}` block is executed and its result is
//! appended to the running transcript; anything else is treated as the
//! final answer and handed to the phase's parser. Bounded by
//! `max_iterations`, read from `AgentConfig::max_tool_iterations`.

use std::sync::Arc;

use forge_core::error::{ForgeError, Result};
use forge_core::types::{Plan, TokenUsage};
use forge_llm::LlmDriver;
use forge_prompt::{
    build_correction_prompt, build_execution_prompt, build_planning_prompt, build_replan_prompt,
    extract_json_block, parse_execution_output, parse_planning_output, ExecutionOutput,
};
use forge_tools::ToolRegistry;

use crate::executor::{CorrectContext, ExecuteContext, Executor, PlanContext, ReplanContext};

const DEFAULT_MAX_ITERATIONS: usize = 8;

pub struct AgentExecutor {
    driver: Arc<LlmDriver>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(driver: Arc<LlmDriver>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            driver,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn tool_instructions(&self) -> String {
        let definitions = self
            .tools
            .get_definitions()
            .iter()
            .map(|d| format!("- {}: {}", d.name, d.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You may inspect the workspace before answering. To call a tool, respond with \
             exactly one JSON object: {{\"tool\": \"<name>\", \"args\": {{...}}}}. Available tools:\n{definitions}\n\
             When you are done inspecting, respond with the final answer in the shape requested above, \
             and nothing else."
        )
    }

    async fn run_loop(
        &self,
        task_id: &forge_core::ids::TaskId,
        system: &str,
        mut transcript: String,
        phase: &str,
    ) -> Result<(String, TokenUsage)> {
        let mut total = TokenUsage::default();
        let system_with_tools = format!("{system}\n\n{}", self.tool_instructions());

        for _ in 0..self.max_iterations {
            let result = self
                .driver
                .call(task_id, &system_with_tools, &transcript, phase)
                .await?;
            total.accumulate(&result.tokens);

            match extract_tool_call(&result.text) {
                Some(call) => {
                    let tool_result = self.tools.execute(&call.tool, call.args).await;
                    transcript.push_str(&format!(
                        "\n\n### tool result ({})\n{}\n",
                        call.tool,
                        tool_result.to_content_string()
                    ));
                }
                None => return Ok((result.text, total)),
            }
        }

        Err(ForgeError::LlmFailed(format!(
            "agent executor exceeded {} tool iterations without a final answer",
            self.max_iterations
        )))
    }
}

#[derive(serde::Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    args: serde_json::Value,
}

fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let block = extract_json_block(text)?;
    serde_json::from_str::<ToolCall>(block).ok()
}

#[async_trait::async_trait]
impl Executor for AgentExecutor {
    async fn plan(&self, ctx: PlanContext<'_>) -> Result<(Plan, TokenUsage)> {
        let pair = build_planning_prompt(
            ctx.task,
            ctx.expected_output,
            ctx.discovery,
            ctx.allowed_write_dirs,
            ctx.research_context,
            ctx.goal_context,
        );
        let (text, tokens) = self.run_loop(ctx.task_id, &pair.system, pair.user, "planning").await?;
        Ok((parse_planning_output(&text, ctx.task), tokens))
    }

    async fn replan(&self, ctx: ReplanContext<'_>) -> Result<(Plan, TokenUsage)> {
        let pair = build_replan_prompt(ctx.task, ctx.expected_output, ctx.failed_files, ctx.discovery);
        let (text, tokens) = self.run_loop(ctx.task_id, &pair.system, pair.user, "replan").await?;
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
        let (text, tokens) = self.run_loop(ctx.task_id, &pair.system, pair.user, "execution").await?;
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
        let (text, tokens) = self.run_loop(ctx.task_id, &pair.system, pair.user, "correction").await?;
        let output = parse_execution_output(&text).ok_or_else(|| {
            ForgeError::ParseFailed("correction output did not match the expected schema".to_string())
        })?;
        Ok((output, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_audit::{AuditTrail, BudgetAudit};
    use forge_discovery::DiscoveryOutput;
    use forge_llm::provider::{LlmProvider, LlmResult, LlmStream};
    use forge_llm::types::{LlmRequest, StreamDelta, Usage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct ScriptedProvider {
        replies: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn models(&self) -> &[&str] {
            &["stub-model"]
        }
        async fn complete_stream(
            &self,
            _request: LlmRequest,
            _cancel: Option<CancellationToken>,
        ) -> LlmResult<LlmStream> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies[index.min(self.replies.len() - 1)].to_string();
            let stream = async_stream::stream! {
                yield Ok(StreamDelta::Text(reply));
                yield Ok(StreamDelta::Done {
                    stop_reason: Some("end_turn".to_string()),
                    usage: Some(Usage { input_tokens: 10, output_tokens: 5 }),
                });
            };
            Ok(Box::pin(stream))
        }
    }

    struct ListFilesTool;

    #[async_trait::async_trait]
    impl forge_tools::Tool for ListFilesTool {
        fn name(&self) -> &str {
            "list_files"
        }
        fn description(&self) -> &str {
            "lists files in the workspace"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value) -> forge_tools::ToolResult {
            forge_tools::ToolResult::text("a.ts\nb.ts")
        }
    }

    fn executor(replies: Vec<&'static str>) -> AgentExecutor {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            replies,
            calls: AtomicUsize::new(0),
        });
        let driver = LlmDriver::new(
            provider,
            "stub-model",
            Arc::new(BudgetAudit::new(100_000, None)),
            Arc::new(AuditTrail::new()),
        );
        let mut registry = ToolRegistry::new();
        registry.register(ListFilesTool);
        AgentExecutor::new(Arc::new(driver), Arc::new(registry))
    }

    #[tokio::test]
    async fn runs_a_tool_call_then_returns_final_plan() {
        let executor = executor(vec![
            r#"{"tool": "list_files", "args": {}}"#,
            r#"{"files_to_read":["a.ts"],"files_to_modify":["a.ts"],"files_to_create":[],"approach":"edit a.ts"}"#,
        ]);
        let task_id: forge_core::ids::TaskId = "t1".into();
        let discovery = DiscoveryOutput::default();
        let (plan, _) = executor
            .plan(PlanContext {
                task_id: &task_id,
                task: "fix a.ts",
                expected_output: "fixed",
                discovery: &discovery,
                allowed_write_dirs: &[],
                research_context: None,
                goal_context: None,
            })
            .await
            .unwrap();
        assert_eq!(plan.files_to_modify, vec!["a.ts".to_string()]);
    }

    #[tokio::test]
    async fn terminates_with_error_when_iterations_are_exhausted() {
        let executor = executor(vec![r#"{"tool": "list_files", "args": {}}"#]).with_max_iterations(2);
        let task_id: forge_core::ids::TaskId = "t1".into();
        let discovery = DiscoveryOutput::default();
        let result = executor
            .plan(PlanContext {
                task_id: &task_id,
                task: "fix a.ts",
                expected_output: "fixed",
                discovery: &discovery,
                allowed_write_dirs: &[],
                research_context: None,
                goal_context: None,
            })
            .await;
        assert!(matches!(result, Err(ForgeError::LlmFailed(_))));
    }
}
