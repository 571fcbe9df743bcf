//! Keyword extraction — component D.2. Locale-aware (English + Portuguese):
//! accent-normalize, lowercase, split on non-alphanumeric, drop stop words
//! and action-verb stems, keep tokens of length >= 3, cap at 10.

use unicode_normalization::UnicodeNormalization;

const STOP_WORDS: &[&str] = &[
    // English
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "with", "that", "this",
    "is", "are", "be", "as", "at", "by", "from", "it", "its", "into", "we", "you", "your",
    "our", "should", "would", "could", "can", "will", "have", "has", "had", "not", "but",
    "all", "any", "some", "also", "when", "where", "how", "what", "which", "use", "using",
    // Portuguese
    "de", "da", "do", "das", "dos", "em", "para", "por", "com", "que", "uma", "um", "os",
    "as", "no", "na", "nos", "nas", "e", "ou", "ao", "aos", "seu", "sua", "seus", "suas",
    "este", "esta", "isso", "esse", "essa", "como", "quando", "onde", "qual", "mais",
];

const ACTION_PREFIXES: &[&str] = &[
    "implement",
    "modific",
    "alter",
    "registrar",
    "mape",
    "criar",
    "create",
    "adicionar",
    "add",
    "atualizar",
    "update",
    "remover",
    "remove",
    "corrigir",
    "fix",
    "refatorar",
    "refactor",
    "aplicar",
    "apply",
    "substituir",
    "replace",
    "override",
];

const MAX_KEYWORDS: usize = 10;
const MIN_TOKEN_LEN: usize = 3;

/// `NFD`-normalize and drop combining marks (covers accented Latin letters).
fn strip_diacritics(s: &str) -> String {
    s.nfd()
        .filter(|c| !matches!(*c as u32, 0x0300..=0x036F))
        .collect()
}

fn is_action_form(token: &str) -> bool {
    if ACTION_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return true;
    }
    if token.len() >= 6 {
        let suffixes = ["ing", "ando", "endo", "ado", "ido"];
        if suffixes.iter().any(|s| token.ends_with(s)) {
            return true;
        }
    }
    false
}

/// Extract up to `MAX_KEYWORDS` content keywords from free text (task
/// description, goal title, etc).
pub fn extract_keywords(text: &str) -> Vec<String> {
    let normalized = strip_diacritics(text).to_lowercase();
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for raw_token in normalized.split(|c: char| !c.is_alphanumeric()) {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        if raw_token.len() < MIN_TOKEN_LEN {
            continue;
        }
        if STOP_WORDS.contains(&raw_token) {
            continue;
        }
        if is_action_form(raw_token) {
            continue;
        }
        if seen.insert(raw_token.to_string()) {
            keywords.push(raw_token.to_string());
        }
    }

    keywords
}
