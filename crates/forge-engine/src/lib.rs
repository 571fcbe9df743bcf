//! Correction Controller (component K) and Engine Driver (component M) —
//! the composition root. Every other crate in the workspace is a leaf or a
//! one-way dependency; this crate is the only one that depends on all of
//! them, and nothing depends on it.

pub mod controller;
pub mod driver;
pub mod events;

pub use controller::{run_correction_loop, ControllerOutcome, CorrectionState, TerminalStatus};
pub use driver::{EngineDriver, ExecutionResult};
