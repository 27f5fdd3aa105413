use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use lc_domain::error::{Error, Result};
use lc_domain::finding::{FindingStatus, Lens, Severity};
use lc_domain::prompt::{BasicPromptBuilder, Indexes};
use lc_domain::session::{LensPreferences, LensPreset};
use lc_domain::stream::BoxStream;
use lc_domain::tool::{Message, ToolDefinition};
use lc_providers::{LlmClient, StreamChunk, TextReply, ToolReply};

use crate::analyze;
use crate::reeval::re_evaluate_finding;

enum ToolScript {
    Findings(Value),
    Truncated,
    ProviderError,
}

/// A scripted [`LlmClient`] that returns a fixed text reply for every
/// `create_message` call and pops canned tool replies in call order for
/// `create_message_with_tool`, exercising the pipeline without a network.
struct ScriptedClient {
    tool_script: Mutex<VecDeque<ToolScript>>,
    text_script: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    fn new(tool_script: Vec<ToolScript>) -> Self {
        Self { tool_script: Mutex::new(tool_script.into()), text_script: Mutex::new(VecDeque::new()) }
    }

    fn with_text_script(tool_script: Vec<ToolScript>, text_script: Vec<&str>) -> Self {
        Self {
            tool_script: Mutex::new(tool_script.into()),
            text_script: Mutex::new(text_script.into_iter().map(str::to_string).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn create_message(&self, _max_tokens: u32, _messages: Vec<Message>) -> Result<TextReply> {
        let text = self.text_script.lock().unwrap().pop_front().unwrap_or_else(|| "lens output".to_string());
        Ok(TextReply { text, truncated: false })
    }

    async fn create_message_with_tool(
        &self,
        _max_tokens: u32,
        _messages: Vec<Message>,
        _tool_schema: ToolDefinition,
        _tool_name: &str,
    ) -> Result<ToolReply> {
        match self.tool_script.lock().unwrap().pop_front() {
            Some(ToolScript::Findings(value)) => Ok(ToolReply { tool_input: value, truncated: false, raw_text: String::new() }),
            Some(ToolScript::Truncated) => Ok(ToolReply { tool_input: json!({}), truncated: true, raw_text: "too long".into() }),
            Some(ToolScript::ProviderError) | None => {
                Err(Error::Provider { provider: "scripted".into(), message: "no response scripted".into() })
            }
        }
    }

    async fn stream_message(&self, _max_tokens: u32, _messages: Vec<Message>) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        unimplemented!("not exercised by these tests")
    }
}

fn finding_payload(number: u32, lens: &str, line_start: u32, line_end: u32, severity: &str) -> Value {
    json!({
        "number": number,
        "severity": severity,
        "lens": lens,
        "location": format!("line {line_start}"),
        "line_start": line_start,
        "line_end": line_end,
        "evidence": "evidence text",
        "impact": "impact text",
        "options": ["do something"],
    })
}

fn chunk_payload(findings: Vec<Value>) -> Value {
    json!({
        "glossary_issues": [],
        "summary": {},
        "findings": findings,
        "conflicts": [],
        "ambiguities": [],
    })
}

#[tokio::test]
async fn analyze_merges_chunks_and_reranks() {
    let client = ScriptedClient::new(vec![
        ToolScript::Findings(chunk_payload(vec![finding_payload(1, "prose", 1, 2, "minor")])),
        ToolScript::Findings(chunk_payload(vec![finding_payload(1, "structure", 10, 12, "critical")])),
        ToolScript::Findings(chunk_payload(vec![finding_payload(1, "logic", 20, 21, "major")])),
    ]);
    let builder = BasicPromptBuilder;
    let indexes: Indexes = Indexes::new();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);

    let report = analyze(&client, &builder, "line one\nline two", &indexes, 1024, 2048, &prefs).await.unwrap();

    assert_eq!(report.findings.len(), 3);
    // Critical finding (structure) should outrank major (logic) and minor (prose) under balanced weights.
    assert_eq!(report.findings[0].lens, Lens::Structure);
    assert_eq!(report.findings[0].number, 1);
    assert_eq!(report.findings[2].number, 3);
}

#[tokio::test]
async fn analyze_falls_back_to_single_call_when_every_chunk_is_truncated() {
    let client = ScriptedClient::new(vec![
        ToolScript::Truncated, // prose chunk
        ToolScript::Truncated, // structure chunk
        ToolScript::Truncated, // coherence chunk
        ToolScript::Findings(chunk_payload(vec![finding_payload(1, "prose", 1, 2, "major")])), // single-call fallback
    ]);
    let builder = BasicPromptBuilder;
    let indexes: Indexes = Indexes::new();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);

    let report = analyze(&client, &builder, "a scene with one line", &indexes, 1024, 2048, &prefs).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].lens, Lens::Prose);
}

#[tokio::test(start_paused = true)]
async fn analyze_errors_when_chunks_and_fallback_both_fail() {
    let client = ScriptedClient::new(vec![
        ToolScript::Truncated,
        ToolScript::Truncated,
        ToolScript::Truncated,
        ToolScript::ProviderError,
        ToolScript::ProviderError,
        ToolScript::ProviderError,
    ]);
    let builder = BasicPromptBuilder;
    let indexes: Indexes = Indexes::new();
    let prefs = LensPreferences::from_preset(LensPreset::Balanced);

    let result = analyze(&client, &builder, "scene text", &indexes, 1024, 2048, &prefs).await;
    assert!(matches!(result, Err(Error::Coordination { .. })));
}

#[tokio::test]
async fn re_evaluate_finding_applies_updated_outcome() {
    let client = ScriptedClient::with_text_script(
        vec![],
        vec!["{\"status\": \"updated\", \"line_start\": 5, \"line_end\": 6, \"location\": \"new spot\", \"evidence\": \"still off\", \"severity\": \"minor\"}"],
    );
    let builder = BasicPromptBuilder;
    let mut finding = sample_finding();
    finding.stale = true;

    re_evaluate_finding(&client, &builder, &mut finding, "L1: a\nL2: b").await.unwrap();

    assert!(!finding.stale);
    assert_eq!(finding.line_start, Some(5));
    assert_eq!(finding.line_end, Some(6));
    assert_eq!(finding.severity, Severity::Minor);
}

#[tokio::test]
async fn re_evaluate_finding_applies_withdrawn_outcome() {
    let client =
        ScriptedClient::with_text_script(vec![], vec!["```json\n{\"status\": \"withdrawn\", \"reason\": \"typo fixed\"}\n```"]);
    let builder = BasicPromptBuilder;
    let mut finding = sample_finding();
    finding.stale = true;

    re_evaluate_finding(&client, &builder, &mut finding, "L1: a").await.unwrap();

    assert!(!finding.stale);
    assert_eq!(finding.status, FindingStatus::Withdrawn);
    assert!(finding.outcome_reason.contains("typo fixed"));
}

fn sample_finding() -> lc_domain::finding::Finding {
    lc_domain::finding::Finding {
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
