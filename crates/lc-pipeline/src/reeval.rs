//! Stale-finding re-evaluation (SPEC_FULL §4.7 step 5). Grounded on
//! `original_source/lit_platform/runtime/api.py::re_evaluate_finding`.

use serde_json::Value;

use lc_domain::error::{Error, Result};
use lc_domain::finding::{Finding, Severity};
use lc_domain::prompt::PromptBuilder;
use lc_domain::tool::Message;
use lc_providers::LlmClient;
use lc_state::{apply_re_evaluation_result, ReEvaluationOutcome, ReEvaluationUpdate};

const RE_EVALUATION_MAX_TOKENS: u32 = 1024;

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Re-evaluates one stale finding against the edited scene text, mutating
/// it in place (clearing `stale`) on success. On parse/provider failure the
/// finding is left untouched (still stale) and the error is returned for
/// the caller to log.
pub async fn re_evaluate_finding(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    finding: &mut Finding,
    numbered_scene: &str,
) -> Result<()> {
    let prompt = prompt_builder.re_evaluation_prompt(finding, numbered_scene);
    let reply = client.create_message(RE_EVALUATION_MAX_TOKENS, vec![Message::user(prompt)]).await?;

    let cleaned = strip_code_fences(&reply.text);
    let data: Value = serde_json::from_str(cleaned).map_err(|e| {
        Error::Validation(format!("re-evaluation response for finding #{} was not valid JSON: {e}", finding.number))
    })?;

    let status = data.get("status").and_then(Value::as_str).unwrap_or_default();
    match status {
        "updated" => {
            let update = ReEvaluationUpdate {
                line_start: data.get("line_start").and_then(Value::as_u64).map(|n| n as u32),
                line_end: data.get("line_end").and_then(Value::as_u64).map(|n| n as u32),
                location: data.get("location").and_then(Value::as_str).map(str::to_string),
                evidence: data.get("evidence").and_then(Value::as_str).map(str::to_string),
                severity: data.get("severity").and_then(Value::as_str).map(Severity::coerce),
            };
            apply_re_evaluation_result(finding, &ReEvaluationOutcome::Updated, Some(&update));
            Ok(())
        }
        "withdrawn" => {
            let reason = data.get("reason").and_then(Value::as_str).unwrap_or("scene edit resolved the issue").to_string();
            apply_re_evaluation_result(finding, &ReEvaluationOutcome::Withdrawn { reason }, None);
            Ok(())
        }
        other => Err(Error::Validation(format!(
            "re-evaluation for finding #{} returned unexpected status '{other}'",
            finding.number
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"status\": \"withdrawn\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"status\": \"withdrawn\"}");
    }

    #[test]
    fn strips_bare_code_fence() {
        let raw = "```\n{\"status\": \"updated\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"status\": \"updated\"}");
    }

    #[test]
    fn leaves_plain_json_untouched() {
        let raw = "{\"status\": \"updated\"}";
        assert_eq!(strip_code_fences(raw), raw);
    }
}
