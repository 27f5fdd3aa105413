//! Contract-level tests: SPEC_FULL §4.9's "all request/response schemas
//! reject unknown fields" rule, exercised directly against the wire
//! structs rather than through a live HTTP server.

use crate::contracts::{AnalyzeRequest, DiscussRequest, ReEvaluateRequest};

#[test]
fn analyze_request_rejects_unknown_top_level_field() {
    let raw = serde_json::json!({
        "scene_text": "L001: once upon a time",
        "indexes": {},
        "model_config": {
            "model": "sonnet",
            "api_keys": {"anthropic": "sk-test"},
            "max_tokens": 4096,
        },
        "lens_preferences": {"preset": "balanced"},
        "unexpected_field": true,
    });
    let result: Result<AnalyzeRequest, _> = serde_json::from_value(raw);
    assert!(result.is_err(), "unknown top-level field must be rejected");
}

#[test]
fn analyze_request_accepts_well_formed_payload() {
    let raw = serde_json::json!({
        "scene_text": "L001: once upon a time",
        "indexes": {"CANON": "the lantern was broken"},
        "model_config": {
            "model": "sonnet",
            "api_keys": {"anthropic": "sk-test"},
            "max_tokens": 4096,
        },
        "lens_preferences": {"preset": "auto", "weight_overrides": {"prose": 1.5}},
    });
    let result: Result<AnalyzeRequest, _> = serde_json::from_value(raw);
    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn discuss_request_rejects_unknown_field() {
    let raw = serde_json::json!({
        "scene_text": "L001: once upon a time",
        "finding": sample_finding_json(),
        "discussion_context": [],
        "prior_outcomes_summary": "",
        "author_message": "are you sure?",
        "model_config": {
            "model": "sonnet",
            "api_keys": {"anthropic": "sk-test"},
            "max_tokens": 1024,
        },
        "extra": "nope",
    });
    let result: Result<DiscussRequest, _> = serde_json::from_value(raw);
    assert!(result.is_err());
}

#[test]
fn re_evaluate_request_rejects_unknown_field() {
    let raw = serde_json::json!({
        "stale_finding": sample_finding_json(),
        "updated_scene_text": "L001: once upon a time, again",
        "model_config": {
            "model": "sonnet",
            "api_keys": {"anthropic": "sk-test"},
            "max_tokens": 1024,
        },
        "bogus": 1,
    });
    let result: Result<ReEvaluateRequest, _> = serde_json::from_value(raw);
    assert!(result.is_err());
}

fn sample_finding_json() -> serde_json::Value {
    serde_json::json!({
        "number": 1,
        "severity": "major",
        "lens": "continuity",
        "location": "opening",
        "line_start": 1,
        "line_end": 2,
        "scene_path": null,
        "evidence": "lantern lit with no matches",
        "impact": "breaks continuity",
        "options": ["add a match-striking beat"],
        "flagged_by": ["continuity"],
        "ambiguity_type": null,
        "stale": false,
        "status": "pending",
        "author_response": "",
        "discussion_turns": [],
        "revision_history": [],
        "outcome_reason": "",
    })
}
