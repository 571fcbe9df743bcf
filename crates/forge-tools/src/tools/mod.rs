//! Tools available to the tool-using Executor variant. Each one is a thin,
//! sanitized wrapper around a workspace operation also used elsewhere in the
//! engine (`apply::apply_one_edit`, `sanitize::sanitize`).

pub mod edit;
pub mod glob;
pub mod read;
pub mod write;
