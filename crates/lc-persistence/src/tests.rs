use lc_domain::finding::{Finding, FindingStatus, Lens, Severity};
use lc_domain::session::{LensPreferences, LensPreset};

use crate::ProjectStore;

fn sample_finding(number: u32) -> Finding {
    Finding {
        number,
        severity: Severity::Major,
        lens: Lens::Continuity,
        location: "L10-L12".to_string(),
        line_start: Some(10),
        line_end: Some(12),
        scene_path: None,
        evidence: "the lantern is lit despite no matches".to_string(),
        impact: "breaks continuity".to_string(),
        options: vec!["add a match earlier".to_string()],
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
fn create_session_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();

    let prefs = LensPreferences::from_preset(LensPreset::Balanced);
    let session_id = store
        .create_session(&["scene-1.md".to_string()], "abc123", "sonnet", None, &prefs)
        .unwrap();

    store.save_findings(session_id, &[sample_finding(1), sample_finding(2)]).unwrap();

    let loaded = store.get_session(session_id).unwrap().expect("session exists");
    assert_eq!(loaded.session_id, session_id);
    assert_eq!(loaded.scene_paths, vec!["scene-1.md".to_string()]);
    assert_eq!(loaded.findings.len(), 2);
    assert_eq!(loaded.findings[0].evidence, "the lantern is lit despite no matches");
}

#[test]
fn persist_finding_updates_session_counters() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);
    let session_id = store
        .create_session(&["scene-1.md".to_string()], "abc123", "sonnet", None, &prefs)
        .unwrap();
    store.save_findings(session_id, &[sample_finding(1)]).unwrap();

    let mut f = sample_finding(1);
    f.status = FindingStatus::Accepted;
    f.outcome_reason = "Accepted by author".to_string();
    store.persist_finding(session_id, &f).unwrap();

    let loaded = store.get_session(session_id).unwrap().unwrap();
    assert_eq!(loaded.findings[0].status, FindingStatus::Accepted);
}

#[test]
fn persist_finding_auto_completes_and_reopens_session() {
    use lc_domain::session::SessionStatus;

    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);
    let session_id = store
        .create_session(&["scene-1.md".to_string()], "abc123", "sonnet", None, &prefs)
        .unwrap();
    store.save_findings(session_id, &[sample_finding(1)]).unwrap();

    let mut f = sample_finding(1);
    f.status = FindingStatus::Accepted;
    f.outcome_reason = "Accepted by author".to_string();
    store.persist_finding(session_id, &f).unwrap();

    // Every finding is now terminal: the auto-save chokepoint completes the
    // session on its own, with no explicit `complete_session` call.
    let loaded = store.get_session(session_id).unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Completed);

    let learning = store.load_learning("My Novel").unwrap();
    assert_eq!(learning.review_count, 0, "auto-completion must not touch the review count");

    // Reverting the finding to a non-terminal status reopens the session
    // (§8 invariant 2), again through the same chokepoint.
    let mut f = sample_finding(1);
    f.status = FindingStatus::Pending;
    store.persist_finding(session_id, &f).unwrap();

    let loaded = store.get_session(session_id).unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Active);
    assert!(loaded.completed_at.is_none());
}

#[test]
fn complete_session_increments_review_count_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);
    let session_id = store
        .create_session(&["scene-1.md".to_string()], "abc123", "sonnet", None, &prefs)
        .unwrap();

    store.complete_session(session_id, "My Novel").unwrap();
    let learning = store.load_learning("My Novel").unwrap();
    assert_eq!(learning.review_count, 1);

    store.complete_session(session_id, "My Novel").unwrap();
    let learning = store.load_learning("My Novel").unwrap();
    assert_eq!(learning.review_count, 2);
}

#[test]
fn add_learning_entry_idempotent_skips_substring_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();

    let inserted_first = store
        .add_learning_entry_idempotent(
            "My Novel",
            lc_domain::learning::LearningCategory::Preference,
            "[continuity] lantern detail — Author says: \"this is intentional\"",
        )
        .unwrap();
    assert!(inserted_first);

    let inserted_second = store
        .add_learning_entry_idempotent(
            "My Novel",
            lc_domain::learning::LearningCategory::Preference,
            "[continuity] lantern detail — Author says: \"this is intentional\"",
        )
        .unwrap();
    assert!(!inserted_second);

    let persisted = store.load_learning("My Novel").unwrap();
    assert_eq!(persisted.preferences.len(), 1);
}

#[test]
fn apply_scene_change_persists_remapped_findings() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);

    let old_text = (1..=15).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
    let session_id = store
        .create_session(&["scene-1.md".to_string()], &crate::scene_diff::scene_hash(&old_text), "sonnet", None, &prefs)
        .unwrap();

    let mut f = sample_finding(1);
    f.line_start = Some(5);
    f.line_end = Some(5);
    store.save_findings(session_id, &[f]).unwrap();

    let mut new_lines: Vec<String> = (1..=15).map(|n| format!("line {n}")).collect();
    new_lines.insert(0, "PREPENDED".to_string());
    let new_text = new_lines.join("\n");

    let (findings, summary) = store.apply_scene_change(session_id, &old_text, &new_text, 0).unwrap();
    assert_eq!(summary.adjusted, 1);
    assert_eq!(findings[0].line_start, Some(6));

    let loaded = store.get_session(session_id).unwrap().unwrap();
    assert_eq!(loaded.findings[0].line_start, Some(6));
}

#[test]
fn learning_session_snapshot_round_trips_for_crash_recovery() {
    use lc_domain::learning::{Learning, SessionRejection};

    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);
    let session_id = store.create_session(&["scene-1.md".to_string()], "abc123", "sonnet", None, &prefs).unwrap();

    // A fresh session has no pending working-list signals yet.
    let empty = store.load_learning_session(session_id).unwrap();
    assert!(empty.session_rejections.is_empty());

    let mut learning = Learning::new("My Novel".to_string());
    learning.session_rejections.push(SessionRejection {
        lens: "continuity".to_string(),
        pattern: "lantern".to_string(),
        reason: "intentional".to_string(),
        preference_rule: None,
    });
    store.persist_learning_session(session_id, &learning).unwrap();

    // Simulates a crash before the commit pass drained the working list:
    // the snapshot survives on the session row and merges back in on load.
    let mut reloaded_learning = Learning::new("My Novel".to_string());
    store.load_learning_session(session_id).unwrap().merge_into(&mut reloaded_learning);
    assert_eq!(reloaded_learning.session_rejections.len(), 1);
    assert_eq!(reloaded_learning.session_rejections[0].pattern, "lantern");
}
