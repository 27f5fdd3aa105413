//! Coordinator calls: chunked (default) and single-call (fallback)
//! (SPEC_FULL §4.2 steps 3-6). Grounded on
//! `original_source/lit_platform/runtime/api.py`'s `_run_coordinator_chunk`,
//! `run_coordinator_chunked`, and `run_coordinator`.

use std::time::Duration;

use serde_json::{Map, Value};

use lc_domain::error::{Error, Result};
use lc_domain::finding::{Finding, Lens, LensChunk};
use lc_domain::prompt::PromptBuilder;
use lc_domain::tool::Message;
use lc_providers::LlmClient;

use crate::convert::finding_from_value;
use crate::dedup::dedup_across_chunks;
use crate::lens::LensOutcome;
use crate::tool_schema::{report_findings_tool, REPORT_FINDINGS_TOOL_NAME};
use crate::validator::validate_coordinator_output;

pub const COORDINATOR_MAX_RETRIES: u32 = 3;
pub const COORDINATOR_RETRY_BASE_SECONDS: u64 = 2;

/// The merged, not-yet-reranked result of one coordinator pass (chunked or
/// single-call).
#[derive(Debug, Clone, Default)]
pub struct CoordinatorOutput {
    pub findings: Vec<Finding>,
    pub glossary_issues: Vec<String>,
    pub conflicts: Vec<String>,
    pub ambiguities: Vec<String>,
    pub summary: Map<String, Value>,
}

fn string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn extend_strings(target: &mut Vec<String>, value: &Value, key: &str) {
    target.extend(string_array(value, key));
}

async fn call_coordinator_tool(
    client: &dyn LlmClient,
    prompt: String,
    max_tokens: u32,
) -> Result<(Value, bool, String)> {
    let reply = client
        .create_message_with_tool(max_tokens, vec![Message::user(prompt)], report_findings_tool(), REPORT_FINDINGS_TOOL_NAME)
        .await?;
    Ok((reply.tool_input, reply.truncated, reply.raw_text))
}

/// Runs one coordinator chunk for a single lens group. Raises
/// `Error::Coordination` on a structural failure or truncation.
async fn run_coordinator_chunk(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    chunk: LensChunk,
    lens_outputs: &[(Lens, String)],
    numbered_scene: &str,
    max_tokens: u32,
) -> Result<Value> {
    let prompt = prompt_builder.coordinator_chunk_prompt(chunk, lens_outputs, numbered_scene);
    let (tool_input, truncated, raw_text) = call_coordinator_tool(client, prompt, max_tokens).await?;

    if truncated {
        return Err(Error::Coordination {
            message: format!("coordinator chunk '{chunk:?}' output truncated at {max_tokens} tokens"),
            raw_output_excerpt: raw_text.chars().take(2000).collect(),
            attempts: 1,
        });
    }

    validate_coordinator_output(tool_input)
}

/// Runs the coordinator in 3 chunks (prose → structure → coherence),
/// merging client-side: findings are concatenated and cross-chunk
/// duplicates are removed. A chunk with no successful lens input is
/// skipped; a chunk whose coordinator call fails logs a warning and the
/// remaining chunks still run. Errors only if every chunk produced nothing.
pub async fn run_coordinator_chunked(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    lens_results: &[LensOutcome],
    numbered_scene: &str,
    max_tokens: u32,
) -> Result<CoordinatorOutput> {
    let mut out = CoordinatorOutput::default();

    for chunk in LensChunk::ORDER {
        let lens_outputs: Vec<(Lens, String)> = chunk
            .members()
            .into_iter()
            .filter_map(|lens| {
                lens_results
                    .iter()
                    .find(|r| r.lens == lens && r.error.is_none())
                    .map(|r| (lens, r.raw_output.clone()))
            })
            .collect();

        if lens_outputs.is_empty() {
            tracing::info!(?chunk, "skipping coordinator chunk — no successful lens results");
            continue;
        }

        tracing::debug!(?chunk, "coordinating chunk");
        match run_coordinator_chunk(client, prompt_builder, chunk, &lens_outputs, numbered_scene, max_tokens).await {
            Ok(data) => {
                if let Some(findings) = data.get("findings").and_then(Value::as_array) {
                    out.findings.extend(findings.iter().map(finding_from_value));
                }
                extend_strings(&mut out.glossary_issues, &data, "glossary_issues");
                extend_strings(&mut out.conflicts, &data, "conflicts");
                extend_strings(&mut out.ambiguities, &data, "ambiguities");
                if let Some(summary) = data.get("summary").and_then(Value::as_object) {
                    for (k, v) in summary {
                        out.summary.insert(k.clone(), v.clone());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(?chunk, error = %e, "coordinator chunk failed");
            }
        }
    }

    if out.findings.is_empty() {
        return Err(Error::Coordination {
            message: "all coordinator chunks failed — no findings produced".to_string(),
            raw_output_excerpt: String::new(),
            attempts: 1,
        });
    }

    out.findings = dedup_across_chunks(out.findings);
    for (i, finding) in out.findings.iter_mut().enumerate() {
        finding.number = (i + 1) as u32;
    }

    for group in ["prose", "structure", "coherence"] {
        out.summary.entry(group).or_insert_with(|| serde_json::json!({"critical": 0, "major": 0, "minor": 0}));
    }

    Ok(out)
}

/// Single-call coordinator covering every successful lens at once, used as
/// a fallback when every chunk fails. Retries transient errors up to
/// `max_retries` times with exponential backoff (base
/// `COORDINATOR_RETRY_BASE_SECONDS`); structural validation errors are not
/// retried.
pub async fn run_coordinator(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    lens_results: &[LensOutcome],
    numbered_scene: &str,
    max_tokens: u32,
    max_retries: u32,
) -> Result<CoordinatorOutput> {
    let lens_outputs: Vec<(Lens, String)> =
        lens_results.iter().filter(|r| r.error.is_none()).map(|r| (r.lens, r.raw_output.clone())).collect();
    let prompt = prompt_builder.coordinator_prompt(&lens_outputs, numbered_scene);

    let mut last_error: Option<Error> = None;
    for attempt in 1..=max_retries {
        let (tool_input, truncated, raw_text) = match call_coordinator_tool(client, prompt.clone(), max_tokens).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(attempt, max_retries, error = %e, "coordinator attempt failed");
                last_error = Some(e);
                if attempt < max_retries {
                    let wait = COORDINATOR_RETRY_BASE_SECONDS.pow(attempt);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                continue;
            }
        };

        if truncated {
            return Err(Error::Coordination {
                message: format!(
                    "coordinator output truncated at {max_tokens} tokens; the scene may have too many \
                     findings for a single call"
                ),
                raw_output_excerpt: raw_text.chars().take(2000).collect(),
                attempts: attempt,
            });
        }

        let data = validate_coordinator_output(tool_input)?;
        let findings: Vec<Finding> =
            data.get("findings").and_then(Value::as_array).map(|arr| arr.iter().map(finding_from_value).collect()).unwrap_or_default();

        return Ok(CoordinatorOutput {
            findings,
            glossary_issues: string_array(&data, "glossary_issues"),
            conflicts: string_array(&data, "conflicts"),
            ambiguities: string_array(&data, "ambiguities"),
            summary: data.get("summary").and_then(Value::as_object).cloned().unwrap_or_default(),
        });
    }

    Err(Error::Coordination {
        message: format!(
            "coordinator failed after {max_retries} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ),
        raw_output_excerpt: String::new(),
        attempts: max_retries,
    })
}
