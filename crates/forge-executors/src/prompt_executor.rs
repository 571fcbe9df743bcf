//! In-repo planner/executor — the default, LLM-only `Executor` variant.
//! Pure assemble-call-parse, no tool loop: one `LlmDriver::call` per
//! phase, using `forge-prompt`'s builders and parsers directly.

use std::sync::Arc;

use forge_core::error::{ForgeError, Result};
use forge_llm::LlmDriver;
use forge_prompt::{
    build_correction_prompt, build_execution_prompt, build_planning_prompt, build_replan_prompt,
    parse_execution_output, parse_planning_output,
};

use crate::executor::{CorrectContext, ExecuteContext, Executor, PlanContext, ReplanContext};

pub struct PromptExecutor {
    driver: Arc<LlmDriver>,
}

impl PromptExecutor {
    pub fn new(driver: Arc<LlmDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait::async_trait]
impl Executor for PromptExecutor {
    async fn plan(&self, ctx: PlanContext<'_>) -> Result<(forge_core::types::Plan, forge_core::types::TokenUsage)> {
        let pair = build_planning_prompt(
            ctx.task,
            ctx.expected_output,
            ctx.discovery,
            ctx.allowed_write_dirs,
            ctx.research_context,
            ctx.goal_context,
        );
        let result = self
            .driver
            .call(ctx.task_id, &pair.system, &pair.user, "planning")
            .await?;
        Ok((parse_planning_output(&result.text, ctx.task), result.tokens))
    }

    async fn replan(&self, ctx: ReplanContext<'_>) -> Result<(forge_core::types::Plan, forge_core::types::TokenUsage)> {
        let pair = build_replan_prompt(ctx.task, ctx.expected_output, ctx.failed_files, ctx.discovery);
        let result = self
            .driver
            .call(ctx.task_id, &pair.system, &pair.user, "replan")
            .await?;
        Ok((parse_planning_output(&result.text, ctx.task), result.tokens))
    }

    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<(forge_prompt::ExecutionOutput, forge_core::types::TokenUsage)> {
        let pair = build_execution_prompt(
            ctx.task,
            ctx.plan,
            ctx.file_bodies,
            ctx.import_aliases,
            ctx.preexisting_lint_errors,
            ctx.prior_attempt_summaries,
            ctx.allowed_write_dirs,
        );
        let result = self
            .driver
            .call(ctx.task_id, &pair.system, &pair.user, "execution")
            .await?;
        let output = parse_execution_output(&result.text).ok_or_else(|| {
            ForgeError::ParseFailed("execution output did not match the expected schema".to_string())
        })?;
        Ok((output, result.tokens))
    }

    async fn correct(&self, ctx: CorrectContext<'_>) -> Result<(forge_prompt::ExecutionOutput, forge_core::types::TokenUsage)> {
        let pair = build_correction_prompt(
            ctx.previous_output,
            ctx.validation,
            ctx.type_snippets,
            ctx.offending_file_bodies,
            ctx.escalate,
        );
        let result = self
            .driver
            .call(ctx.task_id, &pair.system, &pair.user, "correction")
            .await?;
        let output = parse_execution_output(&result.text).ok_or_else(|| {
            ForgeError::ParseFailed("correction output did not match the expected schema".to_string())
        })?;
        Ok((output, result.tokens))
    }
}
