//! Scoring — component D.5. Ranks indexed files against the task's
//! keywords; ties are broken by path lexicographic order by the caller.

use crate::index::{FileIndexEntry, FileRole};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScoredFile {
    pub path: String,
    pub score: i64,
}

fn style_keyword(keyword: &str) -> bool {
    matches!(
        keyword,
        "theme" | "color" | "colors" | "style" | "styles" | "css" | "token" | "tokens"
            | "tema" | "cor" | "cores" | "estilo"
    )
}

/// Score one indexed file against `keywords`.
pub fn score_file(entry: &FileIndexEntry, keywords: &[String]) -> i64 {
    let mut score: i64 = 0;
    let path_lower = entry.path.to_lowercase();
    let segments: Vec<&str> = path_lower.split('/').collect();

    for keyword in keywords {
        let kw = keyword.to_lowercase();

        for export in &entry.exports {
            let export_lower = export.to_lowercase();
            if export_lower == kw {
                score += 15;
            } else if export_lower.contains(&kw) {
                score += 10;
            }
        }

        for segment in &segments {
            let segment_clean = segment.trim_start_matches(['.', ':', '-']);
            if *segment_clean == kw {
                score += 7;
            } else if segment_clean.contains(kw.as_str()) {
                score += 4;
            }
        }

        if path_lower.contains(&kw) {
            score += 3;
        }

        if entry.role == FileRole::Style && style_keyword(&kw) {
            score += 20;
        }
    }

    if matches!(entry.role, FileRole::Component | FileRole::Hook | FileRole::Config) {
        score += 2;
    }
    if entry.exports.len() >= 3 {
        score += 2;
    }

    score
}

/// Score and sort every entry in `index`, descending by score then
/// ascending by path.
pub fn rank_files(
    index: &crate::index::RepositoryIndex,
    keywords: &[String],
) -> Vec<ScoredFile> {
    let mut scored: Vec<ScoredFile> = index
        .values()
        .map(|entry| ScoredFile {
            path: entry.path.clone(),
            score: score_file(entry, keywords),
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileIndexEntry;

    fn entry(path: &str, exports: &[&str], role: FileRole) -> FileIndexEntry {
        FileIndexEntry {
            path: path.to_string(),
            exports: exports.iter().map(|s| s.to_string()).collect(),
            role,
            size: 100,
        }
    }

    #[test]
    fn exact_export_match_outscores_substring_match() {
        let exact = entry("src/x.ts", &["Theme"], FileRole::Other);
        let substring = entry("src/y.ts", &["ThemeProvider"], FileRole::Other);
        let kws = vec!["theme".to_string()];
        assert!(score_file(&exact, &kws) > score_file(&substring, &kws));
        assert_eq!(score_file(&exact, &kws), 15);
        assert_eq!(score_file(&substring, &kws), 10);
    }

    #[test]
    fn style_file_gets_style_keyword_bonus() {
        let style = entry("src/theme/tokens.css", &[".card"], FileRole::Style);
        let kws = vec!["theme".to_string()];
        // path segment exact match (7) + style bonus (20) + path substring (3)
        assert_eq!(score_file(&style, &kws), 30);
    }

    #[test]
    fn component_role_gets_small_bonus() {
        let e = entry("src/components/Unrelated.tsx", &["Unrelated"], FileRole::Component);
        assert_eq!(score_file(&e, &["zzz".to_string()]), 2);
    }

    #[test]
    fn rank_files_breaks_ties_by_path() {
        let mut index = crate::index::RepositoryIndex::new();
        index.insert("b.ts".into(), entry("b.ts", &[], FileRole::Other));
        index.insert("a.ts".into(), entry("a.ts", &[], FileRole::Other));
        let ranked = rank_files(&index, &[]);
        assert_eq!(ranked[0].path, "a.ts");
        assert_eq!(ranked[1].path, "b.ts");
    }
}
