use lc_domain::learning::{AmbiguityAnswer, Learning, SessionRejection};
use lc_persistence::ProjectStore;

use crate::{commit_pending_learning_entries, export_markdown, increment_review_count, load, parse_markdown};

fn store_in_temp() -> (tempfile::TempDir, ProjectStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::open(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn commit_drains_rejections_and_ambiguity_answers_but_discards_acceptances() {
    let (_dir, store) = store_in_temp();
    let mut learning = Learning::new("My Novel");
    learning.session_rejections.push(SessionRejection {
        lens: "continuity".into(),
        pattern: "lantern is lit".into(),
        reason: "intentional flashback".into(),
        preference_rule: None,
    });
    learning.session_ambiguity_answers.push(AmbiguityAnswer {
        location: "opening".into(),
        description: "lantern already lit".into(),
        intentional: true,
    });
    learning.session_acceptances.push(lc_domain::learning::SessionAcceptance {
        lens: "prose".into(),
        pattern: "purple prose trimmed".into(),
    });

    commit_pending_learning_entries(&store, "My Novel", &mut learning).unwrap();

    assert!(learning.session_rejections.is_empty());
    assert!(learning.session_ambiguity_answers.is_empty());
    assert!(learning.session_acceptances.is_empty());

    let reloaded = load(&store, "My Novel").unwrap();
    assert_eq!(reloaded.preferences.len(), 1);
    assert!(reloaded.preferences[0].description.contains("intentional flashback"));
    assert_eq!(reloaded.ambiguity_intentional.len(), 1);
    assert!(reloaded.ambiguity_accidental.is_empty());
}

#[test]
fn commit_with_preference_rule_uses_the_rule_as_description() {
    let (_dir, store) = store_in_temp();
    let mut learning = Learning::new("My Novel");
    learning.session_rejections.push(SessionRejection {
        lens: "dialogue".into(),
        pattern: "terse exchange".into(),
        reason: "author always writes clipped dialogue in tense scenes".into(),
        preference_rule: Some("Keep dialogue clipped during tense scenes".into()),
    });

    commit_pending_learning_entries(&store, "My Novel", &mut learning).unwrap();

    let reloaded = load(&store, "My Novel").unwrap();
    assert_eq!(reloaded.preferences[0].description, "[dialogue] Keep dialogue clipped during tense scenes");
}

#[test]
fn commit_is_idempotent_across_repeated_calls_with_the_same_signal() {
    let (_dir, store) = store_in_temp();
    let rejection = SessionRejection {
        lens: "logic".into(),
        pattern: "timeline skip".into(),
        reason: "deliberate ellipsis".into(),
        preference_rule: None,
    };

    let mut first = Learning::new("My Novel");
    first.session_rejections.push(rejection.clone());
    commit_pending_learning_entries(&store, "My Novel", &mut first).unwrap();

    let mut second = Learning::new("My Novel");
    second.session_rejections.push(rejection);
    commit_pending_learning_entries(&store, "My Novel", &mut second).unwrap();

    let reloaded = load(&store, "My Novel").unwrap();
    assert_eq!(reloaded.preferences.len(), 1, "duplicate description should not be added twice");
}

#[test]
fn review_count_increments_once_at_completion_not_on_export() {
    let (_dir, store) = store_in_temp();
    let prefs = lc_domain::session::LensPreferences::from_preset(lc_domain::session::LensPreset::Balanced);
    let session_id = store.create_session(&["scene.md".into()], "hash", "sonnet", None, &prefs).unwrap();

    increment_review_count(&store, session_id, "My Novel").unwrap();
    let after_completion = load(&store, "My Novel").unwrap();
    assert_eq!(after_completion.review_count, 1);

    export_markdown(&store, "My Novel").unwrap();
    let after_export = load(&store, "My Novel").unwrap();
    assert_eq!(after_export.review_count, 1, "export must never increment review_count");
}

#[test]
fn export_markdown_has_fixed_section_order() {
    let (_dir, store) = store_in_temp();
    let mut learning = Learning::new("My Novel");
    learning.session_rejections.push(SessionRejection {
        lens: "prose".into(),
        pattern: "adverb heavy".into(),
        reason: "house style".into(),
        preference_rule: Some("Avoid adverb stacking in action beats".into()),
    });
    learning.session_ambiguity_answers.push(AmbiguityAnswer {
        location: "midpoint".into(),
        description: "motive left open".into(),
        intentional: false,
    });
    commit_pending_learning_entries(&store, "My Novel", &mut learning).unwrap();

    let markdown = export_markdown(&store, "My Novel").unwrap();
    let preferences_pos = markdown.find("## Preferences").unwrap();
    let blind_spots_pos = markdown.find("## Blind Spots").unwrap();
    let resolutions_pos = markdown.find("## Resolutions").unwrap();
    let ambiguity_pos = markdown.find("## Ambiguity Patterns").unwrap();
    assert!(preferences_pos < blind_spots_pos);
    assert!(blind_spots_pos < resolutions_pos);
    assert!(resolutions_pos < ambiguity_pos);
}

#[test]
fn parse_markdown_round_trips_a_legacy_learning_export() {
    let exported = "PROJECT: My Novel\nREVIEW_COUNT: 3\n\n## Preferences\n- [prose] present tense in flashbacks\n\n\
                    ## Blind Spots\n- tends to miss POV drift\n\n## Resolutions\n- fixed repeated lantern motif\n\n\
                    ## Ambiguity Patterns\n### Intentional\n- withheld narrator name\n### Accidental\n- unclear pronoun antecedent\n";

    let parsed = parse_markdown("fallback", exported);
    assert_eq!(parsed.project_name, "My Novel");
    assert_eq!(parsed.review_count, 3);
    assert_eq!(parsed.preferences.len(), 1);
    assert_eq!(parsed.blind_spots.len(), 1);
    assert_eq!(parsed.resolutions.len(), 1);
    assert_eq!(parsed.ambiguity_intentional.len(), 1);
    assert_eq!(parsed.ambiguity_accidental.len(), 1);
}
