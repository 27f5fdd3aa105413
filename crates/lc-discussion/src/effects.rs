//! Applies a parsed discussion turn's side effects to the finding, the
//! session-level discussion history, and the learning working lists
//! (SPEC_FULL §4.4). Grounded on
//! `original_source/server/discussion.py::_apply_discussion_side_effects`,
//! shared by both the plain and streaming discussion operations.

use lc_domain::discussion::DiscussionStatus;
use lc_domain::finding::{DiscussionRole, DiscussionTurn, Finding};
use lc_domain::learning::Learning;
use lc_state::{apply_discussion_outcome, record_ambiguity_answer, record_discussion_acceptance, record_discussion_rejection};

use crate::parse::ParsedResponse;

/// Applies `parsed` to `finding`, appends the turn to both `finding`'s and
/// the session's discussion history, and records any learning signal.
/// Returns `(display_text, status)`.
pub fn apply_side_effects(
    finding: &mut Finding,
    discussion_history: &mut Vec<DiscussionTurn>,
    learning: &mut Learning,
    user_message: &str,
    parsed: ParsedResponse,
) -> (String, DiscussionStatus) {
    let ParsedResponse { display_text, status, revision, preference, ambiguity } = parsed;

    finding.discussion_turns.push(DiscussionTurn { role: DiscussionRole::User, content: user_message.to_string() });
    finding.discussion_turns.push(DiscussionTurn { role: DiscussionRole::Assistant, content: display_text.clone() });
    discussion_history.push(DiscussionTurn { role: DiscussionRole::User, content: user_message.to_string() });
    discussion_history.push(DiscussionTurn { role: DiscussionRole::Assistant, content: display_text.clone() });

    apply_discussion_outcome(finding, status, &display_text, user_message, revision.as_ref());

    if let Some(ambiguity) = ambiguity {
        let intentional = ambiguity == lc_domain::discussion::AmbiguityClassification::Intentional;
        record_ambiguity_answer(finding, learning, intentional);
    }

    match status {
        DiscussionStatus::Rejected | DiscussionStatus::Conceded => {
            record_discussion_rejection(finding, learning, user_message, preference.clone());
        }
        DiscussionStatus::Accepted => {
            record_discussion_acceptance(finding, learning);
        }
        _ => {
            if let Some(rule) = preference {
                record_discussion_rejection(finding, learning, user_message, Some(rule));
            }
        }
    }

    (display_text, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::finding::{FindingStatus, Lens, Severity};

    fn sample_finding() -> Finding {
        Finding {
            number: 1,
            severity: Severity::Major,
            lens: Lens::Continuity,
            location: "opening".into(),
            line_start: Some(1),
            line_end: Some(2),
            scene_path: None,
            evidence: "lantern lit with no matches".into(),
            impact: "breaks continuity".into(),
            options: vec!["add a match earlier".into()],
            flagged_by: vec![Lens::Continuity],
            ambiguity_type: None,
            stale: false,
            status: FindingStatus::Pending,
            author_response: String::new(),
            discussion_turns: Vec::new(),
            revision_history: Vec::new(),
            outcome_reason: String::new(),
        }
    }

    #[test]
    fn accepted_records_acceptance_and_clears_nothing_else() {
        let mut finding = sample_finding();
        let mut history = Vec::new();
        let mut learning = Learning::new("My Novel");
        let parsed = ParsedResponse {
            display_text: "Fair enough.".into(),
            status: DiscussionStatus::Accepted,
            revision: None,
            preference: None,
            ambiguity: None,
        };

        apply_side_effects(&mut finding, &mut history, &mut learning, "you're right", parsed);

        assert_eq!(finding.status, FindingStatus::Accepted);
        assert_eq!(learning.session_acceptances.len(), 1);
        assert_eq!(finding.discussion_turns.len(), 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn rejected_with_preference_records_preference_rule() {
        let mut finding = sample_finding();
        let mut history = Vec::new();
        let mut learning = Learning::new("My Novel");
        let parsed = ParsedResponse {
            display_text: "Understood, withdrawing the point.".into(),
            status: DiscussionStatus::Rejected,
            revision: None,
            preference: Some("author always writes present-tense lanterns lit".into()),
            ambiguity: None,
        };

        apply_side_effects(&mut finding, &mut history, &mut learning, "that's intentional, always do this", parsed);

        assert_eq!(finding.status, FindingStatus::Rejected);
        assert_eq!(learning.session_rejections.len(), 1);
        assert_eq!(
            learning.session_rejections[0].preference_rule.as_deref(),
            Some("author always writes present-tense lanterns lit")
        );
    }

    #[test]
    fn preference_during_continue_is_recorded_as_rejection_signal() {
        let mut finding = sample_finding();
        let mut history = Vec::new();
        let mut learning = Learning::new("My Novel");
        let parsed = ParsedResponse {
            display_text: "Noted for future scenes.".into(),
            status: DiscussionStatus::Continue,
            revision: None,
            preference: Some("prefers short sentences in action beats".into()),
            ambiguity: None,
        };

        apply_side_effects(&mut finding, &mut history, &mut learning, "keep sentences short here", parsed);

        assert_eq!(finding.status, FindingStatus::Pending);
        assert_eq!(learning.session_rejections.len(), 1);
    }
}
