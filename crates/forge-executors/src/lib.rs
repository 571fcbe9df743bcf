//! The `Executor` capability and its concrete back-ends.
//!
//! `executor` defines the trait and per-phase context structs;
//! `prompt_executor`, `agent_executor`, and `cli_executor` are the three
//! back-end shapes described in the design notes — in-repo prompt-only,
//! tool-using autonomous agent, and subprocess CLI agent respectively.
//! The Correction Controller in `forge-engine` is written against
//! `dyn Executor` and never names a concrete variant.

pub mod agent_executor;
pub mod cli_executor;
pub mod executor;
pub mod prompt_executor;

pub use agent_executor::AgentExecutor;
pub use cli_executor::CliExecutor;
pub use executor::{CorrectContext, ExecuteContext, Executor, PlanContext, ReplanContext};
pub use prompt_executor::PromptExecutor;
