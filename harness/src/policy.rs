//! `AutonomyPolicy` — the `autonomy_level ∈ 0..=3` lookup table
//! describes: approval threshold, extra write directories beyond the
//! framework defaults, and the git subcommands that tier is allowed to
//! reach. Shaped like an `operator::policy::PolicyTier`
//! allow/deny lists, but keyed by autonomy tier instead of container role.

use std::path::Path;

use forge_core::types::Project;
use forge_tools::sanitize::{sanitize, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    Ask,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
            Decision::Ask => "ASK",
        })
    }
}

/// Same subcommand set `forge-git` enforces internally; mirrored here
/// rather than imported since `forge-git` keeps it private — a policy
/// change there that silently drifts from this table is exactly the kind
/// of regression this harness exists to catch.
const ALLOWED_GIT_SUBCOMMANDS: &[&str] = &[
    "clone", "pull", "checkout", "branch", "add", "commit", "diff", "log", "push", "status",
    "rev-parse", "symbolic-ref",
];

#[derive(Debug, Clone)]
pub struct AutonomyPolicy {
    pub autonomy_level: u8,
    pub approval_threshold: u8,
    pub extra_write_dirs: Vec<String>,
    pub allowed_git_subcommands: Vec<String>,
}

impl AutonomyPolicy {
    /// Table entry for `autonomy_level`. Matches
    /// `Project::approval_threshold` exactly — this harness exists to
    /// catch the day those two definitions diverge.
    pub fn for_level(autonomy_level: u8) -> Self {
        let (approval_threshold, extra_write_dirs): (u8, &[&str]) = match autonomy_level {
            0 => (0, &[]),
            1 => (2, &[]),
            2 => (4, &["tests", "docs"]),
            _ => (5, &["tests", "docs", "scripts"]),
        };
        Self {
            autonomy_level,
            approval_threshold,
            extra_write_dirs: extra_write_dirs.iter().map(|s| s.to_string()).collect(),
            allowed_git_subcommands: ALLOWED_GIT_SUBCOMMANDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn base_write_dirs(&self) -> Vec<String> {
        let mut dirs = vec![
            "src".to_string(),
            "app".to_string(),
            "pages".to_string(),
            "components".to_string(),
        ];
        dirs.extend(self.extra_write_dirs.clone());
        dirs
    }

    /// Decide whether a write to `relative_path` under `workspace_root`
    /// is allowed under this tier's write-directory allowlist.
    pub fn decide_write(&self, workspace_root: &Path, relative_path: &str) -> Decision {
        let dirs = self.base_write_dirs();
        match sanitize(workspace_root, relative_path, Operation::Write, &dirs) {
            Ok(_) => Decision::Allow,
            Err(_) => Decision::Deny,
        }
    }

    /// Decide whether `git subcommand` is reachable for this tier. Every
    /// tier currently shares the same subcommand allowlist — the tier
    /// distinction lives entirely in write directories and approval
    /// threshold — but the method stays tier-scoped so a future
    /// redesign that narrows low-autonomy tiers to read-only git
    /// operations has somewhere to hang that rule.
    pub fn decide_git_subcommand(&self, subcommand: &str) -> Decision {
        if self.allowed_git_subcommands.iter().any(|s| s == subcommand) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// Whether a `CodeChange` of the given `risk` auto-applies at this
    /// tier, or falls through to `Decision::Ask` for external approval.
    pub fn decide_risk(&self, risk: u8) -> Decision {
        if risk < self.approval_threshold {
            Decision::Allow
        } else {
            Decision::Ask
        }
    }

    /// Cross-check this table's approval threshold against the live
    /// `Project::approval_threshold` it's meant to mirror.
    pub fn matches_project(&self, project: &Project) -> bool {
        project.autonomy_level == self.autonomy_level
            && project.approval_threshold() == self.approval_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_zero_never_auto_applies() {
        let policy = AutonomyPolicy::for_level(0);
        assert_eq!(policy.decide_risk(1), Decision::Ask);
    }

    #[test]
    fn tier_three_auto_applies_below_max_risk() {
        let policy = AutonomyPolicy::for_level(3);
        assert_eq!(policy.decide_risk(4), Decision::Allow);
        assert_eq!(policy.decide_risk(5), Decision::Ask);
    }

    #[test]
    fn matches_project_detects_drift() {
        let mut project = Project::new("proj", "git@example.com:x/y.git");
        project.autonomy_level = 2;
        let policy = AutonomyPolicy::for_level(2);
        assert!(policy.matches_project(&project));

        let mut drifted = project.clone();
        drifted.autonomy_level = 3;
        assert!(!policy.matches_project(&drifted));
    }

    #[test]
    fn higher_tiers_unlock_extra_write_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let tier1 = AutonomyPolicy::for_level(1);
        let tier2 = AutonomyPolicy::for_level(2);
        assert_eq!(tier1.decide_write(dir.path(), "docs/readme.md"), Decision::Deny);
        assert_eq!(tier2.decide_write(dir.path(), "docs/readme.md"), Decision::Allow);
    }
}
