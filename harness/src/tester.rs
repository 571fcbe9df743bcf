//! Positive/negative/escalation test matrix over every autonomy tier,
//! run directly against `AutonomyPolicy` — no network, no running engine
//! process required. Shaped like `operator::tester::TestRunner::run_all`
//! (health check skipped here, since there's no container to probe), but
//! the tool-call-over-HTTP tests become direct `sanitize`/`validate_branch_name`
//! calls.

use std::path::PathBuf;

use forge_git::validate_branch_name;

use crate::policy::{AutonomyPolicy, Decision};

#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub expected: Decision,
    pub actual: Decision,
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let icon = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{icon}] {} (expected={}, actual={})",
            self.name, self.expected, self.actual
        )
    }
}

fn check(name: &str, expected: Decision, actual: Decision) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed: expected == actual,
        expected,
        actual,
    }
}

pub struct TestRunner {
    policy: AutonomyPolicy,
    workspace: PathBuf,
}

impl TestRunner {
    pub fn new(autonomy_level: u8, workspace: impl Into<PathBuf>) -> Self {
        Self {
            policy: AutonomyPolicy::for_level(autonomy_level),
            workspace: workspace.into(),
        }
    }

    /// Run the full matrix for this tier. Returns `(passed, failed)`.
    pub fn run_all(&self) -> (usize, usize) {
        let mut results = Vec::new();
        results.extend(self.positive_tests());
        results.extend(self.negative_tests());
        results.extend(self.escalation_tests());

        let passed = results.iter().filter(|r| r.passed).count();
        let failed = results.len() - passed;
        for r in &results {
            if r.passed {
                tracing::info!("  {r}");
            } else {
                tracing::error!("  {r}");
            }
        }
        tracing::info!(
            "autonomy level {}: {passed}/{} passed",
            self.policy.autonomy_level,
            results.len()
        );
        (passed, failed)
    }

    /// Things this tier CAN do.
    fn positive_tests(&self) -> Vec<TestResult> {
        vec![
            check(
                "write under src/ is allowed",
                Decision::Allow,
                self.policy.decide_write(&self.workspace, "src/index.ts"),
            ),
            check(
                "reading an existing allowed git subcommand",
                Decision::Allow,
                self.policy.decide_git_subcommand("diff"),
            ),
            check(
                "a risk-1 change auto-applies at every tier above the most conservative",
                if self.policy.autonomy_level == 0 { Decision::Ask } else { Decision::Allow },
                self.policy.decide_risk(1),
            ),
        ]
    }

    /// Things this tier CANNOT do, regardless of tier.
    fn negative_tests(&self) -> Vec<TestResult> {
        vec![
            check(
                "write under node_modules is always denied",
                Decision::Deny,
                self.policy.decide_write(&self.workspace, "node_modules/x/index.js"),
            ),
            check(
                "write to a .env file is always denied",
                Decision::Deny,
                self.policy.decide_write(&self.workspace, "src/.env.production"),
            ),
            check(
                "write outside the allowlisted directories is denied",
                Decision::Deny,
                self.policy.decide_write(&self.workspace, "random_top_level/file.ts"),
            ),
            check(
                "git rebase is never in the allowlist",
                Decision::Deny,
                self.policy.decide_git_subcommand("rebase"),
            ),
            check(
                "an off-pattern branch name is denied",
                Decision::Deny,
                branch_decision("main"),
            ),
        ]
    }

    /// Bypass attempts: traversal, absolute paths, symlink escape.
    fn escalation_tests(&self) -> Vec<TestResult> {
        let mut results = vec![
            check(
                "parent-dir traversal out of the workspace is denied",
                Decision::Deny,
                self.policy.decide_write(&self.workspace, "../../etc/passwd"),
            ),
            check(
                "absolute path write is denied",
                Decision::Deny,
                self.policy.decide_write(&self.workspace, "/etc/passwd"),
            ),
            check(
                "force-push flag smuggled into a branch name is still just a denied name",
                Decision::Deny,
                branch_decision("forge/task-deadbeef; git push --force"),
            ),
        ];

        if let Some(result) = self.symlink_escape_test() {
            results.push(result);
        }
        results
    }

    #[cfg(unix)]
    fn symlink_escape_test(&self) -> Option<TestResult> {
        let outside = std::env::temp_dir().join(format!("forge-harness-outside-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&outside);
        let link = self.workspace.join("src_escape");
        let _ = std::fs::remove_file(&link);
        if std::os::unix::fs::symlink(&outside, &link).is_err() {
            return None;
        }
        Some(check(
            "a symlink planted inside the workspace cannot escape it",
            Decision::Deny,
            self.policy.decide_write(&self.workspace, "src_escape/secret.txt"),
        ))
    }

    #[cfg(not(unix))]
    fn symlink_escape_test(&self) -> Option<TestResult> {
        None
    }
}

fn branch_decision(name: &str) -> Decision {
    match validate_branch_name(name) {
        Ok(()) => Decision::Allow,
        Err(_) => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn every_tier_passes_its_own_matrix() {
        for level in 0..=3u8 {
            let dir = workspace();
            let runner = TestRunner::new(level, dir.path());
            let (passed, failed) = runner.run_all();
            assert_eq!(failed, 0, "autonomy level {level} had {failed} failing check(s)");
            assert!(passed > 0);
        }
    }

    #[test]
    fn valid_task_branch_name_is_allowed() {
        assert_eq!(branch_decision("forge/task-deadbeef"), Decision::Allow);
    }
}
