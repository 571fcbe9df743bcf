//! Prompt Builder — component E. Pure assembly of system+user prompt pairs
//! from typed context; no I/O. Mirrors the shape of a per-turn
//! message-array builder: gather typed inputs, render fixed sections, hand
//! back strings, never reach out to the filesystem or network itself.

use std::collections::HashMap;

use forge_core::types::{Plan, ValidationResult};
use forge_discovery::DiscoveryOutput;

use crate::budget::{assemble, Section};

/// Total character budget per side of a prompt pair. Conservative relative
/// to typical context windows; leaves headroom for the model's own
/// scratch space and the other side of the pair.
pub const MAX_USER_PROMPT_CHARS: usize = 24_000;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

// re-exported for callers that only need the derive traits
use serde::{Deserialize, Serialize};

const PLANNING_SYSTEM: &str = "You are a senior engineer planning a code change. \
Respond with a single JSON object and nothing else: \
{\"files_to_read\": [...], \"files_to_modify\": [...], \"files_to_create\": [...], \"approach\": \"...\"}.";

const EXECUTION_SYSTEM: &str = "You are a senior engineer implementing a planned code change. \
Respond with a single JSON object and nothing else: \
{\"description\": \"...\", \"risk\": 1-5, \"rollback\": \"...\", \"files\": [{\"path\": \"...\", \"action\": \"create|modify\", \"content\": \"...\", \"edits\": [{\"search\": \"...\", \"replace\": \"...\"}]}]}.";

const CORRECTION_SYSTEM: &str = "You are fixing a code change that failed validation or review. \
Respond with the same JSON shape as before: \
{\"description\": \"...\", \"risk\": 1-5, \"rollback\": \"...\", \"files\": [...]}.";

const REPLAN_SYSTEM: &str = "You are replanning a code change after repeated failures with the \
previous file set. Respond with a planning JSON object only: \
{\"files_to_read\": [...], \"files_to_modify\": [...], \"files_to_create\": [...], \"approach\": \"...\"}.";

/// Build the planning prompt: task, discovered structure, ranked candidate
/// files, and optional prior research/goal context.
pub fn build_planning_prompt(
    task: &str,
    expected_output: &str,
    discovery: &DiscoveryOutput,
    allowed_write_dirs: &[String],
    research_context: Option<&str>,
    goal_context: Option<&str>,
) -> PromptPair {
    let candidates = discovery
        .scored_context_files
        .iter()
        .take(60)
        .map(|f| format!("- {} (score {})", f.path, f.score))
        .collect::<Vec<_>>()
        .join("\n");

    let sections = vec![
        Section::new("task", 10, task),
        Section::new("expected_output", 9, expected_output),
        Section::new(
            "allowed_write_dirs",
            8,
            allowed_write_dirs.join(", "),
        ),
        Section::new("candidate_files", 7, candidates),
        Section::new(
            "keywords",
            5,
            discovery.keywords.join(", "),
        ),
        Section::new(
            "workspace_tree",
            3,
            truncate(&discovery.structure.tree_string, 6_000),
        ),
        Section::new("goal_context", 4, goal_context.unwrap_or_default()),
        Section::new("research_context", 2, research_context.unwrap_or_default()),
    ];

    PromptPair {
        system: PLANNING_SYSTEM.to_string(),
        user: assemble(sections, MAX_USER_PROMPT_CHARS),
    }
}

/// Build the execution prompt: the plan's approach plus the bodies of every
/// file it names, pre-existing lint errors (if any), and summaries of any
/// prior attempt on this task.
pub fn build_execution_prompt(
    task: &str,
    plan: &Plan,
    file_bodies: &HashMap<String, String>,
    import_aliases: &HashMap<String, String>,
    preexisting_lint_errors: Option<&str>,
    prior_attempt_summaries: &[String],
    allowed_write_dirs: &[String],
) -> PromptPair {
    let bodies = plan
        .files_to_read
        .iter()
        .chain(plan.files_to_modify.iter())
        .filter_map(|path| {
            file_bodies
                .get(path)
                .map(|body| format!("### {path}\n```\n{body}\n```"))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let aliases = import_aliases
        .iter()
        .map(|(k, v)| format!("{k} -> {v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let prior = prior_attempt_summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("attempt {}: {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let sections = vec![
        Section::new("task", 10, task),
        Section::new("approach", 9, plan.approach.as_str()),
        Section::new(
            "allowed_write_dirs",
            9,
            allowed_write_dirs.join(", "),
        ),
        Section::new("files_to_create", 8, plan.files_to_create.join(", ")),
        Section::new("file_bodies", 7, bodies),
        Section::new("import_aliases", 4, aliases),
        Section::new(
            "preexisting_lint_errors",
            3,
            preexisting_lint_errors.unwrap_or_default(),
        ),
        Section::new("prior_attempts", 5, prior),
    ];

    PromptPair {
        system: EXECUTION_SYSTEM.to_string(),
        user: assemble(sections, MAX_USER_PROMPT_CHARS),
    }
}

/// Build the correction prompt after a failed validation/review round.
/// `escalate` is set once two consecutive rounds have failed — it appends a
/// bounded excerpt of each offending file's first 80 lines.
pub fn build_correction_prompt(
    previous_output: &str,
    validation: &ValidationResult,
    type_snippets: &[String],
    offending_file_bodies: &HashMap<String, String>,
    escalate: bool,
) -> PromptPair {
    let structured = validation
        .structured
        .iter()
        .map(|e| {
            format!(
                "{}:{}:{} [{}] {}",
                e.file,
                e.line,
                e.col,
                e.rule.as_deref().unwrap_or("?"),
                e.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let escalation = if escalate {
        offending_file_bodies
            .iter()
            .map(|(path, body)| {
                let excerpt: String = body.lines().take(80).collect::<Vec<_>>().join("\n");
                format!("### {path} (first 80 lines)\n```\n{excerpt}\n```")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        String::new()
    };

    let sections = vec![
        Section::new("previous_output", 10, previous_output),
        Section::new("validation_errors", 9, structured),
        Section::new("raw_validator_output", 6, truncate(&validation.raw_output, 4_000)),
        Section::new("type_snippets", 5, type_snippets.join("\n\n")),
        Section::new("escalation", if escalate { 8 } else { 1 }, escalation),
    ];

    PromptPair {
        system: CORRECTION_SYSTEM.to_string(),
        user: assemble(sections, MAX_USER_PROMPT_CHARS),
    }
}

/// Build the replanning prompt after correction rounds are exhausted.
/// Forbids reuse of the failed file set.
pub fn build_replan_prompt(
    task: &str,
    expected_output: &str,
    failed_files: &[String],
    discovery: &DiscoveryOutput,
) -> PromptPair {
    let forbidden = failed_files.join(", ");
    let candidates = discovery
        .scored_context_files
        .iter()
        .filter(|f| !failed_files.contains(&f.path))
        .take(60)
        .map(|f| format!("- {} (score {})", f.path, f.score))
        .collect::<Vec<_>>()
        .join("\n");

    let sections = vec![
        Section::new("task", 10, task),
        Section::new("expected_output", 9, expected_output),
        Section::new("forbidden_files", 9, forbidden),
        Section::new("candidate_files", 7, candidates),
        Section::new("keywords", 4, discovery.keywords.join(", ")),
    ];

    PromptPair {
        system: REPLAN_SYSTEM.to_string(),
        user: assemble(sections, MAX_USER_PROMPT_CHARS),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}\n…(truncated)", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_discovery::WalkResult;

    fn empty_discovery() -> DiscoveryOutput {
        DiscoveryOutput {
            structure: WalkResult::default(),
            keywords: vec!["theme".to_string()],
            scored_context_files: vec![],
            repository_index: Default::default(),
            project_config: Default::default(),
            grep_matches: vec![],
        }
    }

    #[test]
    fn planning_prompt_carries_task_and_keywords() {
        let discovery = empty_discovery();
        let pair = build_planning_prompt(
            "switch to dark theme",
            "dark theme applied",
            &discovery,
            &["src".to_string()],
            None,
            None,
        );
        assert!(pair.user.contains("switch to dark theme"));
        assert!(pair.user.contains("theme"));
        assert!(pair.system.contains("files_to_read"));
    }

    #[test]
    fn execution_prompt_includes_requested_file_bodies_only() {
        let plan = Plan {
            files_to_read: vec!["a.ts".to_string()],
            ..Default::default()
        };
        let mut bodies = HashMap::new();
        bodies.insert("a.ts".to_string(), "export const a = 1;".to_string());
        bodies.insert("b.ts".to_string(), "export const b = 2;".to_string());

        let pair = build_execution_prompt(
            "task",
            &plan,
            &bodies,
            &HashMap::new(),
            None,
            &[],
            &["src".to_string()],
        );
        assert!(pair.user.contains("export const a = 1"));
        assert!(!pair.user.contains("export const b = 2"));
    }

    #[test]
    fn correction_prompt_omits_escalation_block_until_escalated() {
        let validation = ValidationResult::ok();
        let mut bodies = HashMap::new();
        bodies.insert("a.ts".to_string(), "line1\nline2\n".to_string());

        let without = build_correction_prompt("prev", &validation, &[], &bodies, false);
        assert!(!without.user.contains("first 80 lines"));

        let with = build_correction_prompt("prev", &validation, &[], &bodies, true);
        assert!(with.user.contains("first 80 lines"));
    }

    #[test]
    fn replan_prompt_excludes_failed_files_from_candidates() {
        let mut discovery = empty_discovery();
        discovery.scored_context_files = vec![
            forge_discovery::ScoredFile { path: "a.ts".into(), score: 10 },
            forge_discovery::ScoredFile { path: "b.ts".into(), score: 5 },
        ];
        let pair = build_replan_prompt("task", "output", &["a.ts".to_string()], &discovery);
        assert!(pair.user.contains("forbidden_files"));
        assert!(pair.user.contains("b.ts"));
        assert!(!pair.user.contains("- a.ts"));
    }

    #[test]
    fn oversized_sections_respect_the_character_budget() {
        let discovery = empty_discovery();
        let huge_context = "x".repeat(100_000);
        let pair = build_planning_prompt(
            "task",
            "output",
            &discovery,
            &[],
            Some(&huge_context),
            None,
        );
        assert!(pair.user.len() <= MAX_USER_PROMPT_CHARS);
    }
}
