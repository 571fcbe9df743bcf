//! Shared data-model DTOs.
//!
//! This module has no behavior beyond constructors and small classification
//! predicates. It is the leaf every other crate depends on; it depends on
//! nothing in this workspace.

use serde::{Deserialize, Serialize};

use crate::ids::{CodeChangeId, ProjectId, TaskId, TraceId};

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub repo_source: String,
    pub language: String,
    pub framework: Option<String>,
    pub risk_profile: RiskProfile,
    /// 0..=3. Gates `CodeChange::approval_threshold` and the write-dir
    /// allowlist a task may touch; see `AutonomyPolicy` in the policy
    /// harness.
    pub autonomy_level: u8,
    pub base_branch: String,
    pub push_enabled: bool,
    pub monthly_token_budget: u64,
}

impl Project {
    pub fn new(project_id: impl Into<ProjectId>, repo_source: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            repo_source: repo_source.into(),
            language: "typescript".to_string(),
            framework: None,
            risk_profile: RiskProfile::Medium,
            autonomy_level: 1,
            base_branch: "main".to_string(),
            push_enabled: false,
            monthly_token_budget: 2_000_000,
        }
    }

    /// Risk at or above this value always requires external approval,
    /// regardless of validation outcome.
    pub fn approval_threshold(&self) -> u8 {
        match self.autonomy_level {
            0 => 0, // never auto-applies
            1 => 2,
            2 => 4,
            _ => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Delegation
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delegation {
    pub goal_id: String,
    pub task_id: TaskId,
    pub task: String,
    pub expected_output: String,
    #[serde(default)]
    pub research_context: Option<String>,
    #[serde(default)]
    pub goal_title: Option<String>,
    #[serde(default)]
    pub goal_description: Option<String>,
}

impl Delegation {
    pub fn new(task_id: impl Into<TaskId>, task: impl Into<String>) -> Self {
        Self {
            goal_id: String::new(),
            task_id: task_id.into(),
            task: task.into(),
            expected_output: String::new(),
            research_context: None,
            goal_title: None,
            goal_description: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan / FileEdit / FileChange
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub files_to_read: Vec<String>,
    #[serde(default)]
    pub files_to_modify: Vec<String>,
    #[serde(default)]
    pub files_to_create: Vec<String>,
    #[serde(default)]
    pub approach: String,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.files_to_modify.is_empty() && self.files_to_create.is_empty()
    }

    /// Drops any path not present in `known_paths`, preserving order.
    pub fn strip_unknown_paths(&mut self, known_paths: &[String]) {
        let retain = |paths: &mut Vec<String>| {
            paths.retain(|p| known_paths.iter().any(|k| k == p));
        };
        retain(&mut self.files_to_read);
        retain(&mut self.files_to_modify);
        // files_to_create is exempt: those paths are new by definition.
    }

    /// The combined set of paths this plan intends to touch.
    pub fn touched_paths(&self) -> Vec<String> {
        self.files_to_modify
            .iter()
            .chain(self.files_to_create.iter())
            .cloned()
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEdit {
    pub search: String,
    pub replace: String,
}

impl FileEdit {
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.search.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Modify,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub action: ChangeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<Vec<FileEdit>>,
}

impl FileChange {
    /// `create` requires content; `modify` requires edits or content.
    pub fn is_well_formed(&self) -> bool {
        match self.action {
            ChangeAction::Create => self.content.is_some(),
            ChangeAction::Modify => self.content.is_some() || self.edits.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// CodeChange
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodeChangeStatus {
    Proposed,
    PendingApproval,
    Approved,
    Applied,
    Rejected,
    Failed,
    RolledBack,
}

impl CodeChangeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CodeChangeStatus::Applied
                | CodeChangeStatus::Rejected
                | CodeChangeStatus::Failed
                | CodeChangeStatus::RolledBack
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeChange {
    pub id: CodeChangeId,
    pub task_id: TaskId,
    pub description: String,
    pub files_changed: Vec<String>,
    /// 1..=5
    pub risk: u8,
    pub status: CodeChangeStatus,
    pub branch_name: Option<String>,
    pub diff: Option<String>,
    pub commits: Vec<String>,
    pub approved_by: Option<String>,
    pub test_output: Option<String>,
    pub error: Option<String>,
}

impl CodeChange {
    pub fn new(id: impl Into<CodeChangeId>, task_id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            description: String::new(),
            files_changed: Vec::new(),
            risk: 1,
            status: CodeChangeStatus::Proposed,
            branch_name: None,
            diff: None,
            commits: Vec::new(),
            approved_by: None,
            test_output: None,
            error: None,
        }
    }

    /// Whether this change may skip the external-approval gate, per
    /// `Project::approval_threshold`.
    pub fn auto_applies(&self, approval_threshold: u8) -> bool {
        self.risk < approval_threshold
    }
}

// ---------------------------------------------------------------------------
// Validation / Review
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuredError {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub rule: Option<String>,
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: u32,
    pub failed: u32,
    pub raw_output: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub structured: Vec<StructuredError>,
    pub raw_output: String,
    pub test_result: Option<TestResult>,
    /// Set when a type-check failure was also present before any edit was
    /// applied — see the baseline build gate in the Correction Controller.
    pub baseline_build_failed: bool,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub severity: FindingSeverity,
    pub rule: String,
    pub file: String,
    pub line: Option<u32>,
    pub message: String,
}

impl ReviewFinding {
    /// A finding that must block delivery unless escalated to
    /// PARTIAL_SUCCESS.
    pub fn blocks(&self) -> bool {
        self.severity == FindingSeverity::Critical
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReviewResult {
    pub findings: Vec<ReviewFinding>,
}

impl ReviewResult {
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(ReviewFinding::blocks)
    }

    pub fn critical_count(&self) -> usize {
        self.findings.iter().filter(|f| f.blocks()).count()
    }
}

// ---------------------------------------------------------------------------
// Execution events / budget
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub trace_id: TraceId,
    pub agent: String,
    pub event_type: String,
    pub phase: Option<String>,
    pub message: String,
    pub level: EventLevel,
    pub metadata: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ExecutionEvent {
    pub fn new(
        trace_id: TraceId,
        agent: impl Into<String>,
        event_type: impl Into<String>,
        message: impl Into<String>,
        level: EventLevel,
    ) -> Self {
        Self {
            trace_id,
            agent: agent.into(),
            event_type: event_type.into(),
            phase: None,
            message: message.into(),
            level,
            metadata: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: Option<f64>,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost_usd: None,
        }
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        if let Some(cost) = other.cost_usd {
            *self.cost_usd.get_or_insert(0.0) += cost;
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub period: String, // e.g. "2026-07"
    pub total_tokens: u64,
    pub used_tokens: u64,
}

impl BudgetEntry {
    pub fn remaining(&self) -> u64 {
        self.total_tokens.saturating_sub(self.used_tokens)
    }

    pub fn exceeded(&self) -> bool {
        self.used_tokens >= self.total_tokens
    }
}
