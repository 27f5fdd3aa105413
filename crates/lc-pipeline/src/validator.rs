//! Coordinator Output Validator (SPEC_FULL §4.3).
//!
//! Grounded on `original_source/lit_platform/runtime/api.py`'s
//! `_validate_coordinator_output`: operates on the raw tool-call JSON
//! before it is converted into [`lc_domain::finding::Finding`] values, so a
//! model that gets a field wrong in an otherwise-salvageable way still
//! produces usable findings.

use serde_json::{json, Value};

use lc_domain::error::{Error, Result};

const REQUIRED_TOP: [&str; 3] = ["glossary_issues", "summary", "findings"];
const FINDING_REQUIRED: [&str; 7] = ["number", "severity", "lens", "location", "evidence", "impact", "options"];

fn excerpt(value: &Value, max_chars: usize) -> String {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
    rendered.chars().take(max_chars).collect()
}

fn coordination_error(message: impl Into<String>, raw: &Value) -> Error {
    Error::Coordination {
        message: message.into(),
        raw_output_excerpt: excerpt(raw, 2000),
        attempts: 1,
    }
}

/// Validates and patches the coordinator's raw tool-call input in place,
/// returning the (possibly patched) value. Unrecoverable structural issues
/// raise [`Error::Coordination`].
pub fn validate_coordinator_output(mut data: Value) -> Result<Value> {
    let obj = data.as_object().ok_or_else(|| {
        coordination_error("coordinator output is not a JSON object", &data)
    })?;
    for key in REQUIRED_TOP {
        if !obj.contains_key(key) {
            return Err(coordination_error(format!("coordinator output missing required key '{key}'"), &data));
        }
    }

    if !data["findings"].is_array() {
        return Err(coordination_error("coordinator 'findings' is not a list", &data));
    }

    let obj = data.as_object_mut().expect("checked above");
    obj.entry("conflicts").or_insert_with(|| json!([]));
    obj.entry("ambiguities").or_insert_with(|| json!([]));

    let findings = data["findings"].as_array().cloned().unwrap_or_default();
    let mut patched = Vec::with_capacity(findings.len());
    for (i, finding) in findings.into_iter().enumerate() {
        patched.push(validate_finding(i, finding)?);
    }
    data["findings"] = Value::Array(patched);

    Ok(data)
}

fn validate_finding(index: usize, mut finding: Value) -> Result<Value> {
    let Some(obj) = finding.as_object() else {
        return Err(coordination_error(format!("finding #{} is not an object", index + 1), &finding));
    };
    for field in FINDING_REQUIRED {
        if !obj.contains_key(field) {
            return Err(coordination_error(format!("finding #{} missing required field '{field}'", index + 1), &finding));
        }
    }

    let raw_severity = finding["severity"].as_str().unwrap_or("").to_string();
    let normalized = raw_severity.trim().to_ascii_lowercase();
    let severity = match normalized.as_str() {
        "critical" | "major" | "minor" => normalized,
        _ => {
            tracing::warn!(finding_index = index + 1, raw = %raw_severity, "unrecognised severity; defaulting to major");
            "major".to_string()
        }
    };
    finding["severity"] = json!(severity);

    let obj = finding.as_object_mut().expect("checked above");
    if !obj.contains_key("flagged_by") {
        let lens = obj.get("lens").cloned().unwrap_or(json!("unknown"));
        obj.insert("flagged_by".to_string(), json!([lens]));
    }
    obj.entry("ambiguity_type").or_insert(Value::Null);
    obj.entry("line_start").or_insert(Value::Null);
    obj.entry("line_end").or_insert(Value::Null);

    for key in ["line_start", "line_end"] {
        let value = obj.get(key).cloned().unwrap_or(Value::Null);
        if !value.is_null() && !value.is_i64() && !value.is_u64() {
            tracing::warn!(finding_index = index + 1, field = key, "non-integer line field; clearing");
            obj.insert(key.to_string(), Value::Null);
        }
    }

    let line_start = obj.get("line_start").and_then(Value::as_i64);
    let line_end = obj.get("line_end").and_then(Value::as_i64);
    if let (Some(start), Some(end)) = (line_start, line_end) {
        if start > end {
            tracing::warn!(finding_index = index + 1, "line_start > line_end; swapping");
            obj.insert("line_start".to_string(), json!(end));
            obj.insert("line_end".to_string(), json!(start));
        }
    }

    Ok(finding)
}
