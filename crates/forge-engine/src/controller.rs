//! Correction controller — the S0-S6 state machine, expressed as a plain
//! `enum Phase` advanced by a `match` inside an async loop, mirroring a
//! `AgentRuntime::run_turn_cancellable` shape generalized from "call LLM,
//! maybe call tools, repeat" to plan/execute/apply/validate/review/commit.
//!
//! This module owns no I/O beyond what it's handed: the workspace path,
//! an `Executor`, a `Validator`, and the audit/budget handles. The Engine
//! Driver (`driver.rs`) is the only caller and is the one that talks to
//! git and the workspace manager.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use forge_audit::{AuditTrail, BudgetAudit};
use forge_core::error::ForgeError;
use forge_core::ids::TaskId;
use forge_core::types::{
    Plan, ReviewResult, Severity, StructuredError, TokenUsage, ValidationResult,
};
use forge_core::config::ValidationConfig;
use forge_discovery::DiscoveryOutput;
use forge_executors::executor::{CorrectContext, ExecuteContext, Executor, PlanContext, ReplanContext};
use forge_prompt::ExecutionOutput;
use forge_tools::apply::{apply, ApplyResult};
use forge_validate::{review, Validator};

use crate::events;

/// Minimum fraction of the per-task token budget that must remain before a
/// replan may be initiated.
const MIN_REPLAN_BUDGET_FRACTION: f64 = 0.30;

const IMPLEMENTATION_VERBS: &[&str] = &[
    "aplicar", "apply", "implementar", "implement", "criar", "create", "adicionar", "add",
    "alterar", "change", "modificar", "modify", "override", "substituir", "replace",
];

const STYLE_EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less"];

/// What the correction controller does with a given error kind.
/// A plain function rather than a method on `ForgeError` itself: the
/// disposition is context-dependent (a `SearchNotFound` is `Retry` the
/// first time and `Replan` the second, handled separately in the apply
/// branch below) and belongs to the controller that owns that context, not
/// to the error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Replan,
    Terminate,
}

/// Baseline classification for errors surfaced directly by an `Executor`
/// turn (plan/execute/correct), before any controller-local retry state is
/// taken into account. Transient provider/subprocess trouble is worth one
/// more attempt at the same phase; parsing and budget failures are not.
pub fn classify(error: &ForgeError) -> Disposition {
    match error {
        ForgeError::LlmFailed(_) | ForgeError::Timeout(_) | ForgeError::SubprocessFailed { .. } | ForgeError::Io(_) => {
            Disposition::Retry
        }
        ForgeError::SearchNotFound { .. } => Disposition::Replan,
        ForgeError::ParseFailed(_)
        | ForgeError::PlanEmpty
        | ForgeError::BudgetExceeded(_)
        | ForgeError::PathRejected(_)
        | ForgeError::GitDenied(_)
        | ForgeError::ValidationFailed(_)
        | ForgeError::ReviewCritical(_)
        | ForgeError::ApplyFailed { .. }
        | ForgeError::Json(_)
        | ForgeError::Config(_) => Disposition::Terminate,
    }
}

/// Whether `task` contains one of the verbs treated as evidence the
/// task requires file changes, justifying a forced replan on an empty
/// initial plan rather than an immediate terminal failure.
fn looks_like_implementation_task(task: &str) -> bool {
    let lower = task.to_lowercase();
    IMPLEMENTATION_VERBS.iter().any(|v| lower.contains(v))
}

/// A plan is incoherent if none of its touched paths contains any task
/// keyword, in the path itself or in the file's current content — unless
/// every touched path is a style file, the explicit exception for style
/// tasks on style files.
fn is_coherent(plan: &Plan, keywords: &[String], workspace: &Path) -> bool {
    let touched = plan.touched_paths();
    if touched.is_empty() || keywords.is_empty() {
        return true;
    }
    if touched.iter().all(|p| {
        let lower = p.to_lowercase();
        STYLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }) {
        return true;
    }
    touched.iter().any(|path| {
        let lower_path = path.to_lowercase();
        if keywords.iter().any(|k| lower_path.contains(k.as_str())) {
            return true;
        }
        std::fs::read_to_string(workspace.join(path))
            .map(|content| {
                let lower_content = content.to_lowercase();
                keywords.iter().any(|k| lower_content.contains(k.as_str()))
            })
            .unwrap_or(false)
    })
}

/// Read the current body of every path in `paths` that exists under
/// `workspace`. Missing files (e.g. `files_to_create` entries) are simply
/// absent from the map rather than an error.
fn read_file_bodies(workspace: &Path, paths: &[String]) -> HashMap<String, String> {
    paths
        .iter()
        .filter_map(|p| {
            std::fs::read_to_string(workspace.join(p))
                .ok()
                .map(|body| (p.clone(), body))
        })
        .collect()
}

fn review_findings_as_validation(review: &ReviewResult) -> ValidationResult {
    let structured: Vec<StructuredError> = review
        .findings
        .iter()
        .map(|f| StructuredError {
            file: f.file.clone(),
            line: f.line.unwrap_or(0),
            col: 0,
            rule: Some(f.rule.clone()),
            severity: Severity::Error,
            message: f.message.clone(),
        })
        .collect();
    ValidationResult {
        success: false,
        error_count: structured.len(),
        warning_count: 0,
        structured,
        raw_output: review
            .findings
            .iter()
            .map(|f| format!("[{:?}] {}:{:?} {}", f.severity, f.file, f.line, f.message))
            .collect::<Vec<_>>()
            .join("\n"),
        test_result: None,
        baseline_build_failed: false,
    }
}

fn validation_summary(validation: &ValidationResult) -> String {
    format!(
        "{} error(s), {} warning(s)",
        validation.error_count, validation.warning_count
    )
}

/// Per-file and per-round counters the state machine threads through the
/// loop, shaped like a supervisor's `SessionState` retry
/// counters rather than free-floating locals.
#[derive(Debug, Default)]
pub struct CorrectionState {
    pub round: u32,
    pub consecutive_search_failures: HashMap<String, u32>,
    pub consecutive_validation_failures: u32,
    pub review_attempts: u32,
    pub failed_files: HashSet<String>,
    pub prior_attempt_summaries: Vec<String>,
}

impl CorrectionState {
    fn new() -> Self {
        Self::default()
    }

    fn note_apply_failure(&mut self, file: &str) -> u32 {
        self.failed_files.insert(file.to_string());
        let counter = self.consecutive_search_failures.entry(file.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn reset_search_failures(&mut self) {
        self.consecutive_search_failures.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TerminalStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ControllerOutcome {
    pub status: Option<TerminalStatus>,
    pub description: String,
    pub risk: u8,
    pub rollback: String,
    pub files_changed: Vec<String>,
    pub validation: Option<ValidationResult>,
    pub review: Option<ReviewResult>,
    pub error: Option<String>,
    #[serde(skip)]
    pub tokens: TokenUsage,
    pub baseline_build_failed: bool,
}

impl ControllerOutcome {
    fn failed(error: impl Into<String>, tokens: TokenUsage) -> Self {
        Self {
            status: Some(TerminalStatus::Failed),
            error: Some(error.into()),
            tokens,
            ..Default::default()
        }
    }
}

pub struct ControllerContext<'a> {
    pub task_id: &'a TaskId,
    pub task: &'a str,
    pub expected_output: &'a str,
    pub workspace: &'a Path,
    pub allowed_write_dirs: &'a [String],
    pub discovery: &'a DiscoveryOutput,
    pub research_context: Option<&'a str>,
    pub goal_context: Option<&'a str>,
    pub executor: &'a dyn Executor,
    pub validator: &'a Validator,
    pub validation_config: &'a ValidationConfig,
    pub baseline_build_failed: bool,
    pub budget: &'a Arc<BudgetAudit>,
    pub trail: &'a Arc<AuditTrail>,
    pub trace_id: &'a forge_core::ids::TraceId,
    pub max_correction_rounds: u32,
}

enum PlanOutcome {
    Ready(Plan),
    Terminate(ControllerOutcome),
}

async fn plan_phase(ctx: &ControllerContext<'_>, tokens: &mut TokenUsage) -> PlanOutcome {
    ctx.trail.emit(events::plan_started(ctx.trace_id));

    let known_paths: Vec<String> = ctx.discovery.structure.files.iter().map(|f| f.path.clone()).collect();

    let plan_result = ctx
        .executor
        .plan(PlanContext {
            task_id: ctx.task_id,
            task: ctx.task,
            expected_output: ctx.expected_output,
            discovery: ctx.discovery,
            allowed_write_dirs: ctx.allowed_write_dirs,
            research_context: ctx.research_context,
            goal_context: ctx.goal_context,
        })
        .await;

    let mut plan = match plan_result {
        Ok((p, t)) => {
            tokens.accumulate(&t);
            p
        }
        Err(e) => return PlanOutcome::Terminate(ControllerOutcome::failed(format!("planning failed: {e}"), *tokens)),
    };
    plan.strip_unknown_paths(&known_paths);

    let needs_replan = plan.is_empty() || !is_coherent(&plan, &ctx.discovery.keywords, ctx.workspace);

    if !needs_replan {
        return PlanOutcome::Ready(plan);
    }

    if plan.is_empty() && !looks_like_implementation_task(ctx.task) {
        return PlanOutcome::Terminate(ControllerOutcome::failed(
            "planner produced an empty plan for a task with no implementation verb",
            *tokens,
        ));
    }

    replan_phase(ctx, &[], tokens).await
}

async fn replan_phase(ctx: &ControllerContext<'_>, failed_files: &[String], tokens: &mut TokenUsage) -> PlanOutcome {
    if ctx.budget.remaining_fraction(ctx.task_id) < MIN_REPLAN_BUDGET_FRACTION {
        return PlanOutcome::Terminate(ControllerOutcome::failed(
            "budget exceeded: remaining balance below the 30% replan floor",
            *tokens,
        ));
    }

    let known_paths: Vec<String> = ctx.discovery.structure.files.iter().map(|f| f.path.clone()).collect();

    let replan_result = ctx
        .executor
        .replan(ReplanContext {
            task_id: ctx.task_id,
            task: ctx.task,
            expected_output: ctx.expected_output,
            failed_files,
            discovery: ctx.discovery,
        })
        .await;

    let mut plan = match replan_result {
        Ok((p, t)) => {
            tokens.accumulate(&t);
            p
        }
        Err(e) => return PlanOutcome::Terminate(ControllerOutcome::failed(format!("replanning failed: {e}"), *tokens)),
    };
    plan.strip_unknown_paths(&known_paths);

    if plan.is_empty() {
        return PlanOutcome::Terminate(ControllerOutcome::failed(
            "replan produced an empty plan",
            *tokens,
        ));
    }

    let failed_set: HashSet<&str> = failed_files.iter().map(String::as_str).collect();
    let overlaps = plan.touched_paths().iter().any(|p| failed_set.contains(p.as_str()));
    if overlaps {
        return PlanOutcome::Terminate(ControllerOutcome::failed(
            "replan reused a previously failed file",
            *tokens,
        ));
    }

    PlanOutcome::Ready(plan)
}

/// Run the full Correction Controller loop against an already-checked-out
/// task workspace. Returns a terminal `ControllerOutcome`; fatal and
/// retried failures alike are folded into the `status`/`error` fields
/// rather than propagated as a `Result::Err`, matching the "terminal
/// failures are reported, not thrown" posture.
pub async fn run_correction_loop(ctx: ControllerContext<'_>) -> ControllerOutcome {
    let mut tokens = TokenUsage::default();
    let mut state = CorrectionState::new();

    let mut plan = match plan_phase(&ctx, &mut tokens).await {
        PlanOutcome::Ready(p) => p,
        PlanOutcome::Terminate(mut outcome) => {
            outcome.tokens = tokens;
            return outcome;
        }
    };

    let import_aliases = ctx.discovery.project_config.aliases.clone();
    let mut current_output: Option<ExecutionOutput> = None;
    let mut preexisting_lint_errors: Option<String> = None;
    let mut last_validation = ValidationResult::ok();

    'outer: loop {
        if state.round > ctx.max_correction_rounds {
            let mut outcome = ControllerOutcome::failed(
                "correction rounds exhausted",
                tokens,
            );
            outcome.baseline_build_failed = ctx.baseline_build_failed;
            return outcome;
        }

        // S2 ExecuteEdits
        ctx.trail.emit(events::execute_started(ctx.trace_id));
        let file_bodies = read_file_bodies(ctx.workspace, &plan.files_to_read.iter().chain(plan.files_to_modify.iter()).cloned().collect::<Vec<_>>());

        let exec_result = match &current_output {
            None => {
                ctx.executor
                    .execute(ExecuteContext {
                        task_id: ctx.task_id,
                        task: ctx.task,
                        plan: &plan,
                        file_bodies: &file_bodies,
                        import_aliases: &import_aliases,
                        preexisting_lint_errors: preexisting_lint_errors.as_deref(),
                        prior_attempt_summaries: &state.prior_attempt_summaries,
                        allowed_write_dirs: ctx.allowed_write_dirs,
                    })
                    .await
            }
            Some(previous) => {
                let previous_text = serde_json::to_string(previous).unwrap_or_default();
                let escalate = state.consecutive_validation_failures >= 2;
                let offending_files: Vec<String> = previous.files.iter().map(|f| f.path.clone()).collect();
                let offending_bodies = read_file_bodies(ctx.workspace, &offending_files);
                ctx.executor
                    .correct(CorrectContext {
                        task_id: ctx.task_id,
                        previous_output: &previous_text,
                        validation: &last_validation,
                        type_snippets: &[],
                        offending_file_bodies: &offending_bodies,
                        escalate,
                    })
                    .await
            }
        };

        let (output, turn_tokens) = match exec_result {
            Ok((o, t)) => (o, t),
            Err(e) if classify(&e) == Disposition::Retry && state.round < ctx.max_correction_rounds => {
                state.round += 1;
                state
                    .prior_attempt_summaries
                    .push(format!("executor turn failed transiently, retrying: {e}"));
                continue 'outer;
            }
            Err(e) => {
                let mut outcome = ControllerOutcome::failed(format!("execution failed: {e}"), tokens);
                outcome.baseline_build_failed = ctx.baseline_build_failed;
                return outcome;
            }
        };
        tokens.accumulate(&turn_tokens);

        if output.files.is_empty() {
            let mut outcome = ControllerOutcome::failed("execution produced no files to change", tokens);
            outcome.baseline_build_failed = ctx.baseline_build_failed;
            return outcome;
        }

        // S3 Apply
        let apply_result: ApplyResult = apply(&output.files, ctx.workspace, ctx.allowed_write_dirs);

        if !apply_result.success {
            let failed_file = apply_result.failed_file.clone().unwrap_or_default();
            let consecutive = state.note_apply_failure(&failed_file);
            state.round += 1;

            if consecutive >= 2 {
                // S1' replan, forbidding the whole accumulated failed set
                let failed: Vec<String> = state.failed_files.iter().cloned().collect();
                match replan_phase(&ctx, &failed, &mut tokens).await {
                    PlanOutcome::Ready(new_plan) => {
                        plan = new_plan;
                        current_output = None;
                        state.reset_search_failures();
                        preexisting_lint_errors = None;
                        continue 'outer;
                    }
                    PlanOutcome::Terminate(mut outcome) => {
                        outcome.tokens = tokens;
                        outcome.baseline_build_failed = ctx.baseline_build_failed;
                        return outcome;
                    }
                }
            }

            let message = format!("apply failed against {failed_file}: search text not found");
            state.prior_attempt_summaries.push(message.clone());
            last_validation = ValidationResult {
                success: false,
                raw_output: message,
                ..ValidationResult::ok()
            };
            current_output = Some(output);
            continue 'outer;
        }

        // S4 Validate
        let validation = match ctx
            .validator
            .validate(
                ctx.workspace,
                &apply_result.applied_files,
                ctx.validation_config,
                ctx.baseline_build_failed,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let mut outcome = ControllerOutcome::failed(format!("validator subprocess failed: {e}"), tokens);
                outcome.baseline_build_failed = ctx.baseline_build_failed;
                return outcome;
            }
        };

        if !validation.success {
            ctx.trail
                .emit(events::validation_failed(ctx.trace_id, validation_summary(&validation)));
            state.consecutive_validation_failures += 1;
            state.round += 1;
            preexisting_lint_errors = Some(validation.raw_output.clone());

            if state.round > ctx.max_correction_rounds {
                let mut outcome = ControllerOutcome::failed(
                    format!("validation failed after exhausting correction rounds: {}", validation_summary(&validation)),
                    tokens,
                );
                outcome.validation = Some(validation);
                outcome.baseline_build_failed = ctx.baseline_build_failed;
                return outcome;
            }

            ctx.trail.emit(events::correction_round(
                ctx.trace_id,
                state.round,
                format!("validation failed: {}", validation_summary(&validation)),
            ));
            state
                .prior_attempt_summaries
                .push(format!("validation failed: {}", validation_summary(&validation)));
            last_validation = validation;
            current_output = Some(output);
            continue 'outer;
        }

        state.consecutive_validation_failures = 0;

        // S5 Review
        let review_result = match review(ctx.workspace, &apply_result.applied_files) {
            Ok(r) => r,
            Err(e) => {
                let mut outcome = ControllerOutcome::failed(format!("review failed: {e}"), tokens);
                outcome.validation = Some(validation);
                outcome.baseline_build_failed = ctx.baseline_build_failed;
                return outcome;
            }
        };

        if review_result.passed() {
            // S6 Commit — the driver performs the actual git operations;
            // this controller only reports success with the final payload.
            return ControllerOutcome {
                status: Some(TerminalStatus::Success),
                description: output.description,
                risk: output.risk,
                rollback: output.rollback,
                files_changed: apply_result.applied_files,
                validation: Some(validation),
                review: Some(review_result),
                error: None,
                tokens,
                baseline_build_failed: ctx.baseline_build_failed,
            };
        }

        state.review_attempts += 1;
        state.round += 1;

        if state.review_attempts >= 2 {
            return ControllerOutcome {
                status: Some(TerminalStatus::PartialSuccess),
                description: output.description,
                risk: output.risk,
                rollback: output.rollback,
                files_changed: apply_result.applied_files,
                validation: Some(validation),
                review: Some(review_result),
                error: Some(format!(
                    "{} critical review finding(s) unresolved after 2 correction attempts",
                    review_result.critical_count()
                )),
                tokens,
                baseline_build_failed: ctx.baseline_build_failed,
            };
        }

        if state.round > ctx.max_correction_rounds {
            let mut outcome = ControllerOutcome::failed("correction rounds exhausted during review", tokens);
            outcome.validation = Some(validation);
            outcome.review = Some(review_result);
            outcome.baseline_build_failed = ctx.baseline_build_failed;
            return outcome;
        }

        ctx.trail.emit(events::correction_round(
            ctx.trace_id,
            state.round,
            format!("{} critical review finding(s)", review_result.critical_count()),
        ));
        state.prior_attempt_summaries.push(format!(
            "review found {} critical finding(s)",
            review_result.critical_count()
        ));
        let synthetic = review_findings_as_validation(&review_result);
        preexisting_lint_errors = Some(synthetic.raw_output.clone());
        last_validation = synthetic;
        current_output = Some(output);
    }
}
