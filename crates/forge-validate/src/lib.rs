//! Validator + Review — components I and J. Type-checks, lints, and tests
//! a task workspace, then sweeps the changed files for the fixed set of
//! review findings that can block a commit outright.

pub mod review;
pub mod validator;

pub use review::review;
pub use validator::Validator;
