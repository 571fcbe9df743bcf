//! Budget & Audit — component L, the counter half. Per-task counters live
//! in a `DashMap` keyed by `TaskId`; the monthly counter is a single
//! `AtomicU64` shared across every task in the process. Both are
//! incremented with `Relaxed` ordering — a concurrent read may be stale by
//! at most one in-flight increment, which is acceptable here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use forge_core::ids::TaskId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetCheck {
    Ok,
    Exceeded { reason: &'static str },
}

impl BudgetCheck {
    pub fn is_ok(self) -> bool {
        matches!(self, BudgetCheck::Ok)
    }
}

/// Per-task and monthly token counters, plus the limits they're checked
/// against. One instance is shared (via `Arc`) across every task in a
/// process.
pub struct BudgetAudit {
    per_task_limit: u64,
    monthly_limit: Option<u64>,
    task_tokens: DashMap<TaskId, AtomicU64>,
    month_tokens: Arc<AtomicU64>,
}

impl BudgetAudit {
    pub fn new(per_task_limit: u64, monthly_limit: Option<u64>) -> Self {
        Self {
            per_task_limit,
            monthly_limit,
            task_tokens: DashMap::new(),
            month_tokens: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Consulted before each LLM call (with the tokens already spent so
    /// far) and after each response (with the tokens just added).
    pub fn check(&self, task_id: &TaskId) -> BudgetCheck {
        let task_used = self
            .task_tokens
            .get(task_id)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0);
        if task_used >= self.per_task_limit {
            return BudgetCheck::Exceeded {
                reason: "per-task token limit reached",
            };
        }
        if let Some(limit) = self.monthly_limit {
            if self.month_tokens.load(Ordering::Relaxed) >= limit {
                return BudgetCheck::Exceeded {
                    reason: "monthly token limit reached",
                };
            }
        }
        BudgetCheck::Ok
    }

    /// Record tokens spent by one LLM turn, for both the per-task and
    /// monthly counters.
    pub fn record(&self, task_id: &TaskId, tokens: u64) {
        self.task_tokens
            .entry(task_id.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(tokens, Ordering::Relaxed);
        self.month_tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn task_tokens_used(&self, task_id: &TaskId) -> u64 {
        self.task_tokens
            .get(task_id)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn month_tokens_used(&self) -> u64 {
        self.month_tokens.load(Ordering::Relaxed)
    }

    /// Fraction of the per-task budget still remaining, used by the
    /// Correction Controller's "replan only if ≥30% remains" gate.
    pub fn remaining_fraction(&self, task_id: &TaskId) -> f64 {
        if self.per_task_limit == 0 {
            return 0.0;
        }
        let used = self.task_tokens_used(task_id);
        let remaining = self.per_task_limit.saturating_sub(used);
        remaining as f64 / self.per_task_limit as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_calls_under_the_per_task_limit() {
        let audit = BudgetAudit::new(1000, None);
        let task: TaskId = "t1".into();
        audit.record(&task, 400);
        assert!(audit.check(&task).is_ok());
    }

    #[test]
    fn rejects_calls_once_per_task_limit_is_reached() {
        let audit = BudgetAudit::new(1000, None);
        let task: TaskId = "t1".into();
        audit.record(&task, 1000);
        assert_eq!(
            audit.check(&task),
            BudgetCheck::Exceeded {
                reason: "per-task token limit reached"
            }
        );
    }

    #[test]
    fn rejects_calls_once_monthly_limit_is_reached_even_with_task_budget_left() {
        let audit = BudgetAudit::new(1_000_000, Some(500));
        let task: TaskId = "t1".into();
        audit.record(&task, 500);
        assert!(!audit.check(&task).is_ok());
    }

    #[test]
    fn tasks_have_independent_counters() {
        let audit = BudgetAudit::new(1000, None);
        let a: TaskId = "a".into();
        let b: TaskId = "b".into();
        audit.record(&a, 900);
        assert!(audit.check(&a).is_ok());
        assert!(audit.check(&b).is_ok());
        assert_eq!(audit.task_tokens_used(&b), 0);
    }

    #[test]
    fn remaining_fraction_reflects_usage() {
        let audit = BudgetAudit::new(1000, None);
        let task: TaskId = "t1".into();
        audit.record(&task, 700);
        assert!((audit.remaining_fraction(&task) - 0.3).abs() < 1e-9);
    }
}
