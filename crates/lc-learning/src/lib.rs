//! Learning engine (SPEC_FULL §4.8): turns session-scoped rejection/
//! ambiguity/preference signals into durable, cross-session memory.
//!
//! Grounded on `original_source/lit_platform/runtime/learning.py`'s
//! `commit_pending_learning_entries` — the persistence layer
//! ([`lc_persistence`]) only knows how to store and dedup a description
//! string; this crate decides what that string says and which category it
//! belongs to.

use lc_domain::learning::{Learning, LearningCategory};
use lc_domain::Result;
use lc_persistence::ProjectStore;

/// Drains `learning`'s three session-scoped working lists into the
/// long-term category lists, writing each genuinely new entry through
/// `store`. Mirrors the Python hot path: rejections become preferences
/// (never blind spots — `update_learning_from_session` in the original
/// routes every rejection through `add_preference`), ambiguity answers
/// split into the intentional/accidental lists, and acceptances are
/// discarded — they have no long-term mapping in the original system.
///
/// `learning`'s long-term lists are NOT refreshed from the store by this
/// call; reload via [`load`] afterward if the caller needs the committed
/// ids reflected in memory.
pub fn commit_pending_learning_entries(
    store: &ProjectStore,
    project_name: &str,
    learning: &mut Learning,
) -> Result<()> {
    for rejection in learning.session_rejections.drain(..) {
        let description = if let Some(rule) = &rejection.preference_rule {
            format!("[{}] {}", rejection.lens, rule)
        } else {
            format!("[{}] {} — Author says: \"{}\"", rejection.lens, rejection.pattern, rejection.reason)
        };
        store.add_learning_entry_idempotent(project_name, LearningCategory::Preference, &description)?;
    }

    for answer in learning.session_ambiguity_answers.drain(..) {
        let description = format!("{}: {}", answer.location, answer.description);
        let category = if answer.intentional {
            LearningCategory::AmbiguityIntentional
        } else {
            LearningCategory::AmbiguityAccidental
        };
        store.add_learning_entry_idempotent(project_name, category, &description)?;
    }

    // Acceptances have no long-term mapping in the original system; they
    // exist only to bias the same-session discussion prompt.
    learning.session_acceptances.clear();

    Ok(())
}

/// Loads the persisted long-term learning data for a project, reconciling
/// it with an in-memory session struct that may still hold working lists
/// not yet committed (e.g. right after [`commit_pending_learning_entries`]
/// drained them but before a reload).
pub fn load(store: &ProjectStore, project_name: &str) -> Result<Learning> {
    store.load_learning(project_name)
}

/// Increments the review count; called exactly once, at session
/// completion, never from [`commit_pending_learning_entries`].
pub fn increment_review_count(store: &ProjectStore, session_id: uuid::Uuid, project_name: &str) -> Result<()> {
    store.complete_session(session_id, project_name)
}

/// Renders the deterministic `LEARNING.md` export (§4.8).
pub fn export_markdown(store: &ProjectStore, project_name: &str) -> Result<String> {
    store.export_learning_markdown(project_name)
}

/// Parses a legacy `LEARNING.md` document into a `Learning` seed, used for
/// one-time import on a project's first session when no `learning` row
/// exists yet. Grounded on
/// `original_source/lit_platform/runtime/learning.py`'s
/// `_load_learning_from_markdown`.
pub fn parse_markdown(project_name_fallback: &str, markdown: &str) -> Learning {
    use lc_domain::learning::LearningEntry;

    let mut learning = Learning::new(project_name_fallback.to_string());
    let mut section: Option<&str> = None;
    let mut subsection: Option<&str> = None;

    for raw_line in markdown.lines() {
        let line = raw_line.trim();
        if let Some(rest) = line.strip_prefix("PROJECT:") {
            learning.project_name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("REVIEW_COUNT:") {
            if let Ok(count) = rest.trim().parse() {
                learning.review_count = count;
            }
        } else if line == "## Preferences" {
            section = Some("preferences");
            subsection = None;
        } else if line == "## Blind Spots" {
            section = Some("blind_spots");
            subsection = None;
        } else if line == "## Resolutions" {
            section = Some("resolutions");
            subsection = None;
        } else if line == "## Ambiguity Patterns" {
            section = Some("ambiguity");
            subsection = None;
        } else if line == "### Intentional" {
            subsection = Some("intentional");
        } else if line == "### Accidental" {
            subsection = Some("accidental");
        } else if let Some(description) = line.strip_prefix("- ") {
            let entry = LearningEntry { id: 0, description: description.to_string() };
            match section {
                Some("preferences") => learning.preferences.push(entry),
                Some("blind_spots") => learning.blind_spots.push(entry),
                Some("resolutions") => learning.resolutions.push(entry),
                Some("ambiguity") => match subsection {
                    Some("intentional") => learning.ambiguity_intentional.push(entry),
                    Some("accidental") => learning.ambiguity_accidental.push(entry),
                    _ => {}
                },
                _ => {}
            }
        }
    }

    learning
}

#[cfg(test)]
mod tests;
