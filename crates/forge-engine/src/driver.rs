//! Engine Driver — component M, the composition root. Owns one `Arc` each
//! of the handles the Correction Controller needs and is the only place in
//! the workspace that talks to both git and the workspace manager; the
//! controller itself never touches either.

use std::sync::Arc;

use forge_audit::{AuditTrail, BudgetAudit};
use forge_core::config::ForgeConfig;
use forge_core::error::Result;
use forge_core::ids::{CodeChangeId, TraceId};
use forge_core::types::{CodeChange, CodeChangeStatus, Delegation, Project, TokenUsage};
use forge_discovery::ProjectConfig;
use forge_executors::Executor;
use forge_git::{build_task_branch_name, GitManager};
use forge_validate::Validator;
use forge_workspace::WorkspaceManager;
use tracing::{info, warn};

use crate::controller::{run_correction_loop, ControllerContext, ControllerOutcome, TerminalStatus};
use crate::events;

/// Everything a call to `execute` reports back: the final `CodeChange`
/// record plus the event trail an API layer might want to stream out.
#[derive(Debug, serde::Serialize)]
pub struct ExecutionResult {
    pub code_change: CodeChange,
    pub tokens: TokenUsage,
}

/// The composition root. One instance is built per process (or per worker,
/// in a multi-process deployment) and shared across every task it runs.
pub struct EngineDriver {
    workspace: Arc<WorkspaceManager>,
    git: Arc<GitManager>,
    executor: Arc<dyn Executor>,
    validator: Arc<Validator>,
    budget: Arc<BudgetAudit>,
    trail: Arc<AuditTrail>,
    config: ForgeConfig,
}

impl EngineDriver {
    pub fn new(
        workspace: Arc<WorkspaceManager>,
        git: Arc<GitManager>,
        executor: Arc<dyn Executor>,
        validator: Arc<Validator>,
        budget: Arc<BudgetAudit>,
        trail: Arc<AuditTrail>,
        config: ForgeConfig,
    ) -> Self {
        Self {
            workspace,
            git,
            executor,
            validator,
            budget,
            trail,
            config,
        }
    }

    /// Run one delegation to completion: checkout, correction loop, and (on
    /// success) staging/committing/pushing the result. Never returns an
    /// `Err` for a task-level failure — that's folded into the returned
    /// `CodeChange`'s status and `error` field, matching the controller's
    /// own "report, don't throw" posture.
    pub async fn execute(&self, delegation: Delegation, project: Project) -> Result<ExecutionResult> {
        let trace_id = TraceId::new(delegation.task_id.as_str().to_string());
        let code_change_id = CodeChangeId::new(format!("cc-{}", delegation.task_id.short()));
        let mut code_change = CodeChange::new(code_change_id, delegation.task_id.clone());

        self.workspace
            .ensure_base(&project.project_id, &project.repo_source)
            .await?;
        self.workspace
            .ensure_base_dependencies(&project.project_id)
            .await?;

        let task_dir = self
            .workspace
            .create_task_workspace(&project.project_id, &delegation.task_id)
            .await?;

        let branch = build_task_branch_name(&delegation.task_id.short());
        self.git.checkout(&task_dir, &project.base_branch).await.ok();
        self.git.create_branch(&task_dir, &branch).await?;
        code_change.branch_name = Some(branch.clone());

        let baseline_build_failed = if self.config.validation.run_build {
            !self
                .validator
                .type_check(&task_dir)
                .await
                .map(|(ok, _, _)| ok)
                .unwrap_or(false)
        } else {
            false
        };

        let project_config = ProjectConfig::default();
        let discovery = forge_discovery::discover(
            &task_dir,
            &delegation.task,
            project.framework.as_deref(),
            project_config,
            self.config.validation.enable_repository_index,
        )
        .await?;

        let allowed_write_dirs = vec!["src".to_string(), "app".to_string(), "pages".to_string(), "components".to_string()];

        let ctx = ControllerContext {
            task_id: &delegation.task_id,
            task: &delegation.task,
            expected_output: &delegation.expected_output,
            workspace: &task_dir,
            allowed_write_dirs: &allowed_write_dirs,
            discovery: &discovery,
            research_context: delegation.research_context.as_deref(),
            goal_context: delegation.goal_description.as_deref(),
            executor: self.executor.as_ref(),
            validator: &self.validator,
            validation_config: &self.config.validation,
            baseline_build_failed,
            budget: &self.budget,
            trail: &self.trail,
            trace_id: &trace_id,
            max_correction_rounds: self.config.correction.max_correction_rounds,
        };

        let outcome = run_correction_loop(ctx).await;
        code_change.risk = outcome.risk.max(1);
        code_change.description = outcome.description.clone();

        let result = match outcome.status {
            Some(TerminalStatus::Success) | Some(TerminalStatus::PartialSuccess) => {
                self.deliver(&task_dir, &branch, &trace_id, &project, outcome, &mut code_change).await
            }
            _ => {
                code_change.status = CodeChangeStatus::Failed;
                code_change.error = outcome.error.clone();
                self.trail.emit(events::delivery_failed(
                    &trace_id,
                    outcome.error.clone().unwrap_or_else(|| "task failed".to_string()),
                ));
                Ok(outcome.tokens)
            }
        };

        self.workspace.cleanup_task_workspace(
            &project.project_id,
            &delegation.task_id,
            self.config.correction.keep_workspace,
        )?;

        let tokens = result?;
        self.trail.persist_code_change(&code_change);
        self.trail.persist_token_usage(&delegation.task_id, &tokens);
        Ok(ExecutionResult { code_change, tokens })
    }

    /// S6 Commit: stage, commit, diff, optionally push. Staging/commit
    /// failures are terminal for the task; a push failure downgrades status
    /// to `PendingApproval` rather than failing the whole task, since the
    /// commit itself already succeeded locally.
    async fn deliver(
        &self,
        task_dir: &std::path::Path,
        branch: &str,
        trace_id: &TraceId,
        project: &Project,
        outcome: ControllerOutcome,
        code_change: &mut CodeChange,
    ) -> Result<TokenUsage> {
        self.trail.emit(events::commit_started(trace_id));

        self.git.stage(task_dir, &outcome.files_changed).await?;
        let commit_message = if outcome.description.is_empty() {
            "forge: automated change".to_string()
        } else {
            outcome.description.clone()
        };
        let commit_hash = self.git.commit(task_dir, &commit_message).await?;
        let diff = self.git.diff(task_dir, true).await.unwrap_or_default();

        code_change.files_changed = outcome.files_changed;
        code_change.diff = Some(diff);
        code_change.commits = vec![commit_hash];
        code_change.test_output = outcome.validation.as_ref().map(|v| v.raw_output.clone());

        let auto_applies = matches!(outcome.status, Some(TerminalStatus::Success))
            && code_change.auto_applies(project.approval_threshold());

        code_change.status = if auto_applies {
            CodeChangeStatus::Applied
        } else {
            CodeChangeStatus::PendingApproval
        };
        if matches!(outcome.status, Some(TerminalStatus::PartialSuccess)) {
            code_change.error = outcome.error.clone();
        }

        if self.config.storage.push_enabled && project.push_enabled {
            // The remote with injected credentials is the caller's
            // responsibility; this driver only ever sees a plain branch name.
            match self.git.push_to(task_dir, "origin", branch).await {
                Ok(()) => {
                    info!(branch, "pushed task branch");
                }
                Err(e) => {
                    warn!(branch, error = %e, "push failed, leaving change pending local delivery");
                    code_change.error = Some(format!("push failed: {e}"));
                }
            }
        }

        self.trail.emit(events::delivery_complete(
            trace_id,
            format!("{} file(s) committed on {branch}", code_change.files_changed.len()),
        ));

        Ok(outcome.tokens)
    }
}
