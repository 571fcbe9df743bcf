//! Shared data model, error type, identifiers, and configuration for the
//! FORGE code-modification engine. This crate has no behavior beyond
//! constructors and classification predicates, and depends on nothing else
//! in the workspace — every other crate depends on it.

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::ForgeConfig;
pub use error::{ForgeError, Result};
pub use ids::{CodeChangeId, ProjectId, TaskId, TraceId};
pub use types::*;
