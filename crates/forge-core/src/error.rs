//! Shared error type for every FORGE crate.
//!
//! One enum, one variant per error kind the engine needs to reason about.
//! Components surface their own failures through this type rather than
//! minting crate-local error enums, so the Correction Controller can
//! classify any error it receives without knowing which crate raised it.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("path rejected: {0}")]
    PathRejected(String),

    #[error("git operation denied: {0}")]
    GitDenied(String),

    #[error("subprocess failed: {command} (exit {code:?}): {stderr}")]
    SubprocessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("llm call failed: {0}")]
    LlmFailed(String),

    #[error("failed to parse model output: {0}")]
    ParseFailed(String),

    #[error("planner produced an empty plan for an implementation task")]
    PlanEmpty,

    #[error("search text not found in {file}")]
    SearchNotFound { file: String },

    #[error("validation failed: {0} error(s)")]
    ValidationFailed(usize),

    #[error("review found {0} critical finding(s)")]
    ReviewCritical(usize),

    #[error("failed to apply change to {file}: {reason}")]
    ApplyFailed { file: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

impl ForgeError {
    pub fn path_rejected(reason: impl Into<String>) -> Self {
        Self::PathRejected(reason.into())
    }

    pub fn git_denied(reason: impl Into<String>) -> Self {
        Self::GitDenied(reason.into())
    }

    pub fn apply_failed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ApplyFailed {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn search_not_found(file: impl Into<String>) -> Self {
        Self::SearchNotFound { file: file.into() }
    }
}
