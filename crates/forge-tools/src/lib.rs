//! Path Sanitizer (A) and Change Applier (H), plus the tool surface the
//! tool-using Executor variant calls during its own turn.

pub mod apply;
pub mod registry;
pub mod sanitize;
pub mod subprocess;
pub mod tools;

pub use apply::{apply, apply_one_edit, ApplyResult};
pub use registry::{Tool, ToolDefinition, ToolRegistry, ToolResult};
pub use sanitize::{sanitize, Operation};
