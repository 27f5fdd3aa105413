//! Deterministic `LEARNING.md` rendering (§4.8), grounded on
//! `original_source/lit_platform/persistence/learning_store.py`'s
//! `export_markdown`.

use lc_domain::learning::{Learning, LearningCategory};

pub fn render(learning: &Learning) -> String {
    let mut lines = vec![
        "# Learning".to_string(),
        String::new(),
        format!("PROJECT: {}", learning.project_name),
        format!("REVIEW_COUNT: {}", learning.review_count),
        String::new(),
    ];

    render_section(&mut lines, "Preferences", learning.category(LearningCategory::Preference));
    render_section(&mut lines, "Blind Spots", learning.category(LearningCategory::BlindSpot));
    render_section(&mut lines, "Resolutions", learning.category(LearningCategory::Resolution));

    lines.push(String::new());
    lines.push("## Ambiguity Patterns".to_string());
    lines.push(String::new());
    render_subsection(&mut lines, "Intentional", learning.category(LearningCategory::AmbiguityIntentional));
    lines.push(String::new());
    render_subsection(&mut lines, "Accidental", learning.category(LearningCategory::AmbiguityAccidental));

    lines.join("\n")
}

fn render_section(lines: &mut Vec<String>, heading: &str, entries: &[lc_domain::learning::LearningEntry]) {
    lines.push(format!("## {heading}"));
    lines.push(String::new());
    push_entries(lines, entries);
    lines.push(String::new());
}

fn render_subsection(lines: &mut Vec<String>, heading: &str, entries: &[lc_domain::learning::LearningEntry]) {
    lines.push(format!("### {heading}"));
    lines.push(String::new());
    push_entries(lines, entries);
}

fn push_entries(lines: &mut Vec<String>, entries: &[lc_domain::learning::LearningEntry]) {
    if entries.is_empty() {
        lines.push("[none yet]".to_string());
    } else {
        for entry in entries {
            lines.push(format!("- {}", entry.description));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholder_for_empty_categories() {
        let learning = Learning::new("My Novel".to_string());
        let md = render(&learning);
        assert!(md.contains("PROJECT: My Novel"));
        assert!(md.contains("## Preferences"));
        assert!(md.contains("[none yet]"));
    }

    #[test]
    fn section_order_is_fixed() {
        let learning = Learning::new("My Novel".to_string());
        let md = render(&learning);
        let prefs = md.find("## Preferences").unwrap();
        let blind = md.find("## Blind Spots").unwrap();
        let resolutions = md.find("## Resolutions").unwrap();
        let ambiguity = md.find("## Ambiguity Patterns").unwrap();
        assert!(prefs < blind);
        assert!(blind < resolutions);
        assert!(resolutions < ambiguity);
    }
}
