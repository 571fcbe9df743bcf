//! Policy-verification harness — a standalone tool built directly on
//! `forge-tools::sanitize` and `forge-git`'s branch allowlist rather than
//! over HTTP, since the FORGE core exposes no HTTP surface of its own to
//! test against. Shaped like an `operator::policy`/
//! `operator::tester` shape (`Role`/`PolicyTier`/`Decision`,
//! `TestRunner::test_tool_call`), generalized from an HTTP container
//! policy check to direct function calls against the sanitizer and the
//! git branch regex.

pub mod policy;
pub mod tester;

pub use policy::{AutonomyPolicy, Decision};
pub use tester::{TestResult, TestRunner};
