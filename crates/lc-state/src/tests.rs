use lc_domain::discussion::DiscussionStatus;
use lc_domain::finding::{Finding, FindingStatus, Lens, Severity};
use lc_domain::learning::Learning;
use lc_domain::session::{Session, SessionStatus};

use crate::*;

fn finding(number: u32, lens: Lens, severity: Severity) -> Finding {
    Finding {
        number,
        severity,
        lens,
        location: "scene-1.md:12".to_string(),
        line_start: Some(12),
        line_end: Some(14),
        scene_path: None,
        evidence: "the lantern is lit despite no matches in the cabin".to_string(),
        impact: "breaks internal consistency".to_string(),
        options: vec!["add a match earlier".to_string()],
        flagged_by: vec![lens],
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
fn first_unresolved_index_skips_terminal_findings() {
    let mut findings = vec![
        finding(1, Lens::Prose, Severity::Minor),
        finding(2, Lens::Structure, Severity::Major),
        finding(3, Lens::Logic, Severity::Critical),
    ];
    findings[0].status = FindingStatus::Accepted;
    assert_eq!(first_unresolved_index(&findings), Some(1));
}

#[test]
fn all_findings_considered_true_only_when_every_status_terminal() {
    let mut findings = vec![finding(1, Lens::Prose, Severity::Minor)];
    assert!(!all_findings_considered(&findings));
    findings[0].status = FindingStatus::Rejected;
    assert!(all_findings_considered(&findings));
}

#[test]
fn escalated_findings_are_not_terminal() {
    let mut f = finding(1, Lens::Logic, Severity::Major);
    f.status = FindingStatus::Escalated;
    assert!(!f.is_terminal());
    assert!(!all_findings_considered(std::slice::from_ref(&f)));
}

#[test]
fn next_index_for_lens_skips_prose_and_dialogue_for_structure() {
    let findings = vec![
        finding(1, Lens::Prose, Severity::Minor),
        finding(2, Lens::Dialogue, Severity::Minor),
        finding(3, Lens::Structure, Severity::Major),
        finding(4, Lens::Logic, Severity::Major),
    ];
    let idx = next_index_for_lens(&findings, 0, LensNavigationTarget::Structure);
    assert_eq!(idx, 2);
}

#[test]
fn next_index_for_lens_skips_prose_and_structure_for_coherence() {
    let findings = vec![
        finding(1, Lens::Structure, Severity::Minor),
        finding(2, Lens::Prose, Severity::Minor),
        finding(3, Lens::Continuity, Severity::Major),
    ];
    assert_eq!(next_index_for_lens(&findings, 0, LensNavigationTarget::Coherence), 2);
}

#[test]
fn next_available_index_skips_withdrawn() {
    let mut findings = vec![
        finding(1, Lens::Prose, Severity::Minor),
        finding(2, Lens::Structure, Severity::Minor),
        finding(3, Lens::Logic, Severity::Minor),
    ];
    findings[0].status = FindingStatus::Withdrawn;
    findings[1].status = FindingStatus::Withdrawn;
    assert_eq!(next_available_index(&findings, 0), 2);
}

#[test]
fn apply_acceptance_sets_terminal_status_and_outcome_reason() {
    let mut f = finding(1, Lens::Prose, Severity::Minor);
    let mut learning = Learning::new("test-project".to_string());
    apply_acceptance(&mut f, &mut learning);
    assert_eq!(f.status, FindingStatus::Accepted);
    assert!(f.is_terminal());
    assert_eq!(f.outcome_reason, "Accepted by author");
    assert_eq!(learning.session_acceptances.len(), 1);
}

#[test]
fn apply_rejection_records_reason_and_learning_signal() {
    let mut f = finding(1, Lens::Continuity, Severity::Major);
    let mut learning = Learning::new("test-project".to_string());
    apply_rejection(&mut f, &mut learning, "the lantern detail is intentional foreshadowing");
    assert_eq!(f.status, FindingStatus::Rejected);
    assert!(f.outcome_reason.starts_with("Rejected by author:"));
    assert_eq!(learning.session_rejections.len(), 1);
    assert_eq!(learning.session_rejections[0].lens, "continuity");
}

#[test]
fn apply_discussion_outcome_revised_pushes_revision_snapshot() {
    let mut f = finding(1, Lens::Logic, Severity::Major);
    let revision = RevisionFields {
        severity: Some(Severity::Minor),
        evidence: Some("updated evidence text".to_string()),
        impact: None,
        options: None,
    };
    apply_discussion_outcome(
        &mut f,
        DiscussionStatus::Revised,
        "I've softened this to a minor note.",
        "",
        Some(&revision),
    );
    assert_eq!(f.status, FindingStatus::Revised);
    assert_eq!(f.severity, Severity::Minor);
    assert_eq!(f.revision_history.len(), 1);
    assert_eq!(f.revision_history[0].severity, Severity::Major);
    assert!(f.outcome_reason.starts_with("Revised: severity major → minor"));
}

#[test]
fn apply_discussion_outcome_conceded_withdraws_with_critic_reason() {
    let mut f = finding(1, Lens::Clarity, Severity::Minor);
    apply_discussion_outcome(
        &mut f,
        DiscussionStatus::Conceded,
        "You're right, this reads clearly in context.",
        "",
        None,
    );
    assert_eq!(f.status, FindingStatus::Withdrawn);
    assert!(f.outcome_reason.starts_with("Conceded by critic:"));
}

#[test]
fn apply_discussion_outcome_continue_leaves_finding_untouched() {
    let mut f = finding(1, Lens::Dialogue, Severity::Minor);
    let before_status = f.status;
    apply_discussion_outcome(&mut f, DiscussionStatus::Continue, "Can you say more?", "", None);
    assert_eq!(f.status, before_status);
    assert!(f.outcome_reason.is_empty());
}

#[test]
fn record_ambiguity_answer_appends_to_learning() {
    let f = finding(1, Lens::Structure, Severity::Minor);
    let mut learning = Learning::new("test-project".to_string());
    record_ambiguity_answer(&f, &mut learning, true);
    assert_eq!(learning.session_ambiguity_answers.len(), 1);
    assert!(learning.session_ambiguity_answers[0].intentional);
}

#[test]
fn apply_re_evaluation_result_updated_clears_stale_and_normalizes_range() {
    let mut f = finding(1, Lens::Continuity, Severity::Major);
    f.stale = true;
    let update = ReEvaluationUpdate {
        line_start: Some(20),
        line_end: Some(18),
        location: None,
        evidence: None,
        severity: None,
    };
    apply_re_evaluation_result(&mut f, &ReEvaluationOutcome::Updated, Some(&update));
    assert!(!f.stale);
    assert_eq!(f.line_start, Some(18));
    assert_eq!(f.line_end, Some(20));
}

#[test]
fn apply_re_evaluation_result_withdrawn_sets_terminal_status() {
    let mut f = finding(1, Lens::Prose, Severity::Minor);
    f.stale = true;
    apply_re_evaluation_result(
        &mut f,
        &ReEvaluationOutcome::Withdrawn {
            reason: "the scene no longer contains this line".to_string(),
        },
        None,
    );
    assert_eq!(f.status, FindingStatus::Withdrawn);
    assert!(!f.stale);
    assert!(f.is_terminal());
}

#[test]
fn recompute_session_status_completes_when_all_terminal_and_reopens_on_regression() {
    let mut session = Session {
        session_id: uuid::Uuid::new_v4(),
        scene_paths: vec!["scene-1.md".to_string()],
        scene_hash: "deadbeef".to_string(),
        model: "sonnet".to_string(),
        discussion_model: None,
        current_index: 0,
        status: SessionStatus::Active,
        findings: vec![finding(1, Lens::Prose, Severity::Minor)],
        glossary_issues: Vec::new(),
        discussion_history: Vec::new(),
        lens_preferences: lc_domain::session::LensPreferences::from_preset(
            lc_domain::session::LensPreset::Balanced,
        ),
        index_context_hash: None,
        index_context_stale: false,
        index_rerun_prompted: false,
        index_changed_files: Vec::new(),
        index_context_snapshot: Default::default(),
        created_at: chrono::Utc::now(),
        completed_at: None,
        counters: lc_domain::session::SessionCounters::default(),
    };

    session.findings[0].status = FindingStatus::Accepted;
    recompute_session_status(&mut session);
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.completed_at.is_some());

    session.findings[0].status = FindingStatus::Pending;
    recompute_session_status(&mut session);
    assert_eq!(session.status, SessionStatus::Active);
    assert!(session.completed_at.is_none());
}
