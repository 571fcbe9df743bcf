//! Identifier newtypes.
//!
//! `Arc<str>`-backed, same shape as the rest of the stack's session keys:
//! cheap to clone, cheap to hash, and distinct types so a `TaskId` can never
//! be passed where a `ProjectId` is expected.

use std::sync::Arc;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(Arc::from(s.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 hex characters, used for branch/directory names.
            /// Never used as a lookup key — see CodeChange's full-id indexing.
            pub fn short(&self) -> String {
                self.0.chars().take(8).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

id_type!(ProjectId);
id_type!(TaskId);
id_type!(TraceId);
id_type!(CodeChangeId);

impl TaskId {
    /// `forge/task-<8hex>` branch name for this task.
    pub fn branch_name(&self) -> String {
        format!("forge/task-{}", self.short())
    }

    /// `workspaces/<project>/task-<8hex>` directory component.
    pub fn workspace_dir_name(&self) -> String {
        format!("task-{}", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_is_first_8_chars() {
        let id = TaskId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
    }

    #[test]
    fn branch_name_matches_allowed_pattern() {
        let id = TaskId::new("deadbeefcafe0000");
        assert_eq!(id.branch_name(), "forge/task-deadbeef");
    }

    #[test]
    fn distinct_ids_do_not_alias_by_type() {
        let project = ProjectId::new("same");
        let task = TaskId::new("same");
        assert_eq!(project.as_str(), task.as_str());
        // but they are not interchangeable at compile time; this test
        // documents the intent rather than asserting a type-level fact.
    }
}
