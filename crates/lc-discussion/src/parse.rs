//! Tagged-response parsing (SPEC_FULL §4.4). Grounded on
//! `original_source/server/discussion.py::parse_discussion_response`: strip
//! order is REVISION block, then PREFERENCE tag, then AMBIGUITY tag, then
//! exactly one status tag, checked in priority order (most specific first).

use std::sync::OnceLock;

use regex::Regex;

use lc_domain::discussion::{AmbiguityClassification, DiscussionStatus};
use lc_state::RevisionFields;

/// The result of parsing one critic turn's raw text.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub display_text: String,
    pub status: DiscussionStatus,
    pub revision: Option<RevisionFields>,
    pub preference: Option<String>,
    pub ambiguity: Option<AmbiguityClassification>,
}

fn revision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[REVISION\]\s*(.*?)\s*\[/REVISION\]").unwrap())
}

fn preference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[PREFERENCE:\s*(.*?)\]").unwrap())
}

/// Status tags in priority order: the first one found in the (already
/// tag-stripped) text wins, matching the source's dict iteration order.
const STATUS_TAGS: [(&str, DiscussionStatus); 7] = [
    ("[ESCALATED]", DiscussionStatus::Escalated),
    ("[REVISED]", DiscussionStatus::Revised),
    ("[WITHDRAWN]", DiscussionStatus::Withdrawn),
    ("[REJECTED]", DiscussionStatus::Rejected),
    ("[ACCEPTED]", DiscussionStatus::Accepted),
    ("[CONCEDED]", DiscussionStatus::Conceded),
    ("[CONTINUE]", DiscussionStatus::Continue),
];

fn parse_revision_json(raw: &str) -> Option<RevisionFields> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let obj = value.as_object()?;
    Some(RevisionFields {
        severity: obj.get("severity").and_then(|v| v.as_str()).map(lc_domain::finding::Severity::coerce),
        evidence: obj.get("evidence").and_then(|v| v.as_str()).map(str::to_string),
        impact: obj.get("impact").and_then(|v| v.as_str()).map(str::to_string),
        options: obj
            .get("options")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
    })
}

/// Parses one critic turn's raw response text.
pub fn parse_discussion_response(response_text: &str) -> ParsedResponse {
    let mut text = response_text.to_string();

    // Malformed REVISION JSON is silently dropped — the tag is still
    // stripped from the display text, but `revision` stays `None`.
    let mut revision = None;
    if let Some(m) = revision_re().captures(&text) {
        let whole = m.get(0).unwrap();
        revision = parse_revision_json(&m[1]);
        text = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
    }

    let mut preference = None;
    if let Some(m) = preference_re().captures(&text) {
        let whole = m.get(0).unwrap();
        preference = Some(m[1].trim().to_string());
        text = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
    }

    let mut ambiguity = None;
    if text.contains("[AMBIGUITY:INTENTIONAL]") {
        ambiguity = Some(AmbiguityClassification::Intentional);
        text = text.replace("[AMBIGUITY:INTENTIONAL]", "");
    } else if text.contains("[AMBIGUITY:ACCIDENTAL]") {
        ambiguity = Some(AmbiguityClassification::Accidental);
        text = text.replace("[AMBIGUITY:ACCIDENTAL]", "");
    }

    let mut status = DiscussionStatus::Continue;
    for (tag, tag_status) in STATUS_TAGS {
        if text.contains(tag) {
            status = tag_status;
            text = text.replacen(tag, "", 1);
            break;
        }
    }

    ParsedResponse { display_text: text.trim().to_string(), status, revision, preference, ambiguity }
}
