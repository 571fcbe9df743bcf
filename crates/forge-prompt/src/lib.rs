//! Prompt Builder (component E) and Output Parser (component G). Both
//! sides of one LLM turn — what goes in, what must come back out — share
//! the same DTOs, so they live in one crate.

pub mod build;
pub mod budget;
pub mod parse;

pub use build::{
    build_correction_prompt, build_execution_prompt, build_planning_prompt, build_replan_prompt,
    PromptPair,
};
pub use parse::{extract_json_block, parse_execution_output, parse_planning_output, ExecutionOutput};
