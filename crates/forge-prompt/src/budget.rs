//! Hard character-budget enforcement shared by every prompt kind. Sections
//! carry a priority; when the assembled prompt would exceed the budget,
//! whole sections are dropped lowest-priority-first until it fits (or
//! nothing is left to drop).

/// A single labeled block of prompt text. Lower `priority` sections are
/// dropped first when the budget is exceeded.
pub struct Section {
    pub label: &'static str,
    pub priority: u8,
    pub body: String,
}

impl Section {
    pub fn new(label: &'static str, priority: u8, body: impl Into<String>) -> Self {
        Self {
            label,
            priority,
            body: body.into(),
        }
    }

    fn rendered(&self) -> String {
        if self.body.is_empty() {
            String::new()
        } else {
            format!("## {}\n{}\n", self.label, self.body)
        }
    }
}

/// Join `sections` in order, dropping the lowest-priority ones first until
/// the result fits in `budget_chars`. Ties break by declaration order
/// (earlier sections survive).
pub fn assemble(mut sections: Vec<Section>, budget_chars: usize) -> String {
    loop {
        let rendered: String = sections.iter().map(Section::rendered).collect();
        if rendered.len() <= budget_chars || sections.is_empty() {
            return rendered;
        }

        let drop_at = sections
            .iter()
            .enumerate()
            .min_by_key(|(idx, s)| (s.priority, std::cmp::Reverse(*idx)))
            .map(|(idx, _)| idx);
        match drop_at {
            Some(idx) => {
                sections.remove(idx);
            }
            None => return rendered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_all_sections_within_budget() {
        let sections = vec![
            Section::new("a", 1, "short"),
            Section::new("b", 2, "also short"),
        ];
        let out = assemble(sections, 1000);
        assert!(out.contains("short"));
        assert!(out.contains("also short"));
    }

    #[test]
    fn drops_lowest_priority_section_first() {
        let sections = vec![
            Section::new("keep", 5, "x".repeat(50)),
            Section::new("drop", 1, "y".repeat(50)),
        ];
        let out = assemble(sections, 60);
        assert!(out.contains("keep"));
        assert!(!out.contains("drop"));
    }

    #[test]
    fn empty_body_sections_render_to_nothing() {
        let sections = vec![Section::new("empty", 1, "")];
        let out = assemble(sections, 1000);
        assert_eq!(out, "");
    }
}
