//! Converts validated coordinator-output JSON into domain [`Finding`]
//! values.

use serde_json::Value;

use lc_domain::finding::{AmbiguityType, Finding, FindingStatus, Lens, Severity};

fn str_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn parse_lens(raw: &str) -> Lens {
    Lens::parse(raw).unwrap_or_else(|| {
        tracing::warn!(raw, "unrecognised lens name; defaulting to prose");
        Lens::Prose
    })
}

fn parse_ambiguity_type(value: &Value) -> Option<AmbiguityType> {
    match value.as_str()? {
        "unclear" => Some(AmbiguityType::Unclear),
        "ambiguous_possibly_intentional" => Some(AmbiguityType::AmbiguousPossiblyIntentional),
        _ => None,
    }
}

/// Converts one validated finding object into a [`Finding`]. Assumes
/// [`crate::validator::validate_coordinator_output`] has already run, so
/// required fields and defaults are present.
pub fn finding_from_value(value: &Value) -> Finding {
    let lens = parse_lens(&str_field(value, "lens"));

    let flagged_by: Vec<Lens> = value
        .get("flagged_by")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(parse_lens).collect())
        .filter(|v: &Vec<Lens>| !v.is_empty())
        .unwrap_or_else(|| vec![lens]);

    let options = value
        .get("options")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let mut finding = Finding {
        number: value.get("number").and_then(Value::as_u64).unwrap_or(0) as u32,
        severity: Severity::coerce(&str_field(value, "severity")),
        lens,
        location: str_field(value, "location"),
        line_start: value.get("line_start").and_then(Value::as_u64).map(|n| n as u32),
        line_end: value.get("line_end").and_then(Value::as_u64).map(|n| n as u32),
        scene_path: None,
        evidence: str_field(value, "evidence"),
        impact: str_field(value, "impact"),
        options,
        flagged_by,
        ambiguity_type: value.get("ambiguity_type").and_then(parse_ambiguity_type),
        stale: false,
        status: FindingStatus::Pending,
        author_response: String::new(),
        discussion_turns: Vec::new(),
        revision_history: Vec::new(),
        outcome_reason: String::new(),
    };
    finding.normalize_line_range();
    finding
}

/// The reverse direction, used when re-merging deduplicated findings back
/// into JSON for the lens-preference re-ranker, which operates on the wire
/// shape per §4.2.1.
pub fn finding_to_value(finding: &Finding) -> Value {
    serde_json::json!({
        "number": finding.number,
        "severity": finding.severity.to_string(),
        "lens": finding.lens.as_str(),
        "location": finding.location,
        "line_start": finding.line_start,
        "line_end": finding.line_end,
        "evidence": finding.evidence,
        "impact": finding.impact,
        "options": finding.options,
        "flagged_by": finding.flagged_by.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        "ambiguity_type": finding.ambiguity_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_core_fields() {
        let value = serde_json::json!({
            "number": 3,
            "severity": "critical",
            "lens": "continuity",
            "location": "opening",
            "line_start": 5,
            "line_end": 2,
            "evidence": "lantern lit with no matches",
            "impact": "breaks continuity",
            "options": ["add a match earlier"],
            "flagged_by": ["continuity", "logic"],
            "ambiguity_type": null,
        });
        let finding = finding_from_value(&value);
        assert_eq!(finding.number, 3);
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.lens, Lens::Continuity);
        assert_eq!(finding.flagged_by, vec![Lens::Continuity, Lens::Logic]);
        // normalize_line_range should have already swapped these upstream in
        // the validator, but this guards the conversion path too.
        assert_eq!(finding.line_start, Some(2));
        assert_eq!(finding.line_end, Some(5));
    }

    #[test]
    fn unrecognised_lens_defaults_to_prose() {
        let value = serde_json::json!({
            "number": 1, "severity": "major", "lens": "rhythm", "location": "x",
            "evidence": "e", "impact": "i", "options": [],
        });
        assert_eq!(finding_from_value(&value).lens, Lens::Prose);
    }
}
