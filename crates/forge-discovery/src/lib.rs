//! Discovery & Indexing — component D. Walks the workspace, extracts
//! keywords from the task text, builds a repository export index, greps
//! file contents for those keywords, scores and ranks candidate files, and
//! expands the selection along the import graph and framework-specific
//! companion rules.

pub mod framework;
pub mod grep;
pub mod imports;
pub mod index;
pub mod keywords;
pub mod scoring;
pub mod walk;

use std::collections::HashSet;
use std::path::Path;

use forge_core::Result;

pub use framework::FrameworkRule;
pub use grep::GrepMatch;
pub use imports::ProjectConfig;
pub use index::{FileIndexEntry, FileRole, RepositoryIndex};
pub use scoring::ScoredFile;
pub use walk::WalkResult;

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct DiscoveryOutput {
    pub structure: WalkResult,
    pub keywords: Vec<String>,
    pub scored_context_files: Vec<ScoredFile>,
    pub repository_index: RepositoryIndex,
    pub project_config: ProjectConfig,
    pub grep_matches: Vec<GrepMatch>,
}

/// Number of top-scored files carried forward into the planning prompt
/// before import expansion.
const TOP_SCORED_FILES: usize = 40;

/// Run the full discovery pipeline against `workspace_root` for `task_text`.
/// `framework` selects the companion-file rules;
/// `build_index` gates the (relatively expensive) export-index pass, mirroring
/// `ValidationConfig::enable_repository_index`.
pub async fn discover(
    workspace_root: &Path,
    task_text: &str,
    framework: Option<&str>,
    project_config: ProjectConfig,
    build_index: bool,
) -> Result<DiscoveryOutput> {
    let structure = walk::walk(workspace_root)?;
    let keywords = keywords::extract_keywords(task_text);

    let repository_index = if build_index {
        index::build_index(workspace_root, &structure.files, walk::MAX_CONTENT_FILE_BYTES)
    } else {
        RepositoryIndex::new()
    };

    let grep_matches = grep::content_grep(workspace_root, &structure.files, &keywords).await;

    let mut scored_context_files = if repository_index.is_empty() {
        // Without an index, rank purely on grep hit count so discovery still
        // produces *something* useful for planning.
        let mut scored: Vec<ScoredFile> = grep_matches
            .iter()
            .map(|m| ScoredFile {
                path: m.path.clone(),
                score: m.match_count as i64,
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        scored
    } else {
        scoring::rank_files(&repository_index, &keywords)
    };
    scored_context_files.truncate(TOP_SCORED_FILES);

    let known_paths: HashSet<String> = structure.files.iter().map(|f| f.path.clone()).collect();
    let selected: Vec<String> = scored_context_files.iter().map(|f| f.path.clone()).collect();

    let forward = imports::expand_imports(workspace_root, &selected, &project_config, &known_paths);
    let backward_targets: HashSet<String> = selected.iter().cloned().collect();
    let all_paths: Vec<String> = structure.files.iter().map(|f| f.path.clone()).collect();
    let backward = imports::expand_importers(
        workspace_root,
        &all_paths,
        &backward_targets,
        &project_config,
        &known_paths,
    );

    let existing: HashSet<String> = scored_context_files.iter().map(|f| f.path.clone()).collect();
    for path in forward.into_iter().chain(backward) {
        if !existing.contains(&path) {
            scored_context_files.push(ScoredFile { path, score: 1 });
        }
    }

    let rule = framework::rules_for(framework);
    for keyword in &keywords {
        for pattern in framework::companions_for_keyword(framework, keyword) {
            let matches: Vec<String> = known_paths
                .iter()
                .filter(|p| glob_like_match(pattern, p))
                .cloned()
                .collect();
            for m in matches {
                if !scored_context_files.iter().any(|f| f.path == m) {
                    scored_context_files.push(ScoredFile { path: m, score: 1 });
                }
            }
        }
    }
    let _ = &rule.priority_dirs; // consulted by the Prompt Builder's ordering, not re-scored here

    Ok(DiscoveryOutput {
        structure,
        keywords,
        scored_context_files,
        repository_index,
        project_config,
        grep_matches,
    })
}

/// Minimal glob support sufficient for the framework companion patterns
/// above (`layout.*`, `+layout.*`, `layouts/*.vue`) — a trailing `*`
/// matches any suffix within the final path segment.
fn glob_like_match(pattern: &str, path: &str) -> bool {
    let Some(glob) = globset::Glob::new(pattern).ok() else {
        return false;
    };
    let matcher = glob.compile_matcher();
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    matcher.is_match(path) || matcher.is_match(&file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discover_finds_keyword_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/theme")).unwrap();
        std::fs::write(
            dir.path().join("src/theme/tokens.css"),
            ":root {\n  --brand-color: blue;\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("src/unrelated.ts"), "export const x = 1;\n").unwrap();

        let output = discover(
            dir.path(),
            "aplicar tema dark em tokens/vars",
            None,
            ProjectConfig::default(),
            true,
        )
        .await
        .unwrap();

        assert!(output.keywords.contains(&"tema".to_string()));
        assert!(output
            .scored_context_files
            .iter()
            .any(|f| f.path == "src/theme/tokens.css"));
    }

    #[tokio::test]
    async fn discover_without_index_falls_back_to_grep_ranking() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "const widget = 1;\n").unwrap();

        let output = discover(dir.path(), "fix the widget", None, ProjectConfig::default(), false)
            .await
            .unwrap();
        assert!(output.repository_index.is_empty());
        assert!(output.scored_context_files.iter().any(|f| f.path == "a.ts"));
    }
}
