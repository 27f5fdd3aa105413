use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use lc_domain::error::{Error, Result};
use lc_domain::finding::{DiscussionTurn, Finding, FindingStatus, Lens, Severity};
use lc_domain::learning::Learning;
use lc_domain::prompt::BasicPromptBuilder;
use lc_domain::stream::BoxStream;
use lc_domain::tool::{Message, ToolDefinition};
use lc_providers::{LlmClient, StreamChunk, TextReply, ToolReply};

use crate::{discuss, discuss_stream, DiscussionStreamEvent};

/// A scripted client that returns one fixed critic reply per call, or
/// fails every call when `fail` is set — exercising `discuss`'s "never
/// corrupts state on a transient failure" behavior.
struct ScriptedClient {
    reply: Mutex<Option<String>>,
    fail: bool,
}

impl ScriptedClient {
    fn ok(reply: &str) -> Self {
        Self { reply: Mutex::new(Some(reply.to_string())), fail: false }
    }

    fn failing() -> Self {
        Self { reply: Mutex::new(None), fail: true }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn create_message(&self, _max_tokens: u32, _messages: Vec<Message>) -> Result<TextReply> {
        if self.fail {
            return Err(Error::Provider { provider: "scripted".into(), message: "down".into() });
        }
        let text = self.reply.lock().unwrap().clone().unwrap_or_default();
        Ok(TextReply { text, truncated: false })
    }

    async fn create_message_with_tool(
        &self,
        _max_tokens: u32,
        _messages: Vec<Message>,
        _tool_schema: ToolDefinition,
        _tool_name: &str,
    ) -> Result<ToolReply> {
        unimplemented!("not exercised by these tests")
    }

    async fn stream_message(&self, _max_tokens: u32, _messages: Vec<Message>) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        if self.fail {
            return Err(Error::Provider { provider: "scripted".into(), message: "down".into() });
        }
        let text = self.reply.lock().unwrap().clone().unwrap_or_default();
        let words: Vec<String> = text.split(' ').map(|w| format!("{w} ")).collect();
        let mut chunks: Vec<Result<StreamChunk>> = words.into_iter().map(|w| Ok(StreamChunk::Text(w))).collect();
        chunks.push(Ok(StreamChunk::Done { text, truncated: false }));
        Ok(Box::pin(stream::iter(chunks)))
    }
}

fn sample_finding() -> Finding {
    Finding {
        number: 1,
        severity: Severity::Major,
        lens: Lens::Continuity,
        location: "opening".into(),
        line_start: Some(1),
        line_end: Some(2),
        scene_path: None,
        evidence: "the lantern is lit with no matches struck".into(),
        impact: "breaks established continuity".into(),
        options: vec!["add a match-striking beat".into()],
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

#[tokio::test]
async fn discuss_applies_accepted_status_and_persists_turn() {
    let client = ScriptedClient::ok("Fair point. [ACCEPTED]");
    let builder = BasicPromptBuilder;
    let mut finding = sample_finding();
    let mut history: Vec<DiscussionTurn> = Vec::new();
    let mut learning = Learning::new("My Novel");

    let (text, status) = discuss(
        &client,
        &builder,
        &mut finding,
        &mut history,
        &mut learning,
        "L001: lantern is lit\n",
        "",
        "you're right, fixing it",
        false,
    )
    .await;

    assert_eq!(text, "Fair point.");
    assert_eq!(status, lc_domain::discussion::DiscussionStatus::Accepted);
    assert_eq!(finding.status, FindingStatus::Accepted);
    assert_eq!(finding.discussion_turns.len(), 2);
    assert_eq!(history.len(), 2);
    assert_eq!(learning.session_acceptances.len(), 1);
}

#[tokio::test]
async fn discuss_on_provider_failure_continues_without_mutating_finding() {
    let client = ScriptedClient::failing();
    let builder = BasicPromptBuilder;
    let mut finding = sample_finding();
    let mut history: Vec<DiscussionTurn> = Vec::new();
    let mut learning = Learning::new("My Novel");

    let (text, status) =
        discuss(&client, &builder, &mut finding, &mut history, &mut learning, "", "", "are you sure?", false).await;

    assert!(text.contains("Discussion error"));
    assert_eq!(status, lc_domain::discussion::DiscussionStatus::Continue);
    assert_eq!(finding.status, FindingStatus::Pending);
    assert!(finding.discussion_turns.is_empty());
}

#[tokio::test]
async fn discuss_stream_yields_tokens_then_exactly_one_done() {
    use futures_util::StreamExt;

    let client = ScriptedClient::ok("Good catch. [REVISED]\n[REVISION]\n{\"severity\":\"minor\"}\n[/REVISION]");
    let builder = BasicPromptBuilder;
    let mut finding = sample_finding();
    let mut history: Vec<DiscussionTurn> = Vec::new();
    let mut learning = Learning::new("My Novel");

    let stream = discuss_stream(&client, &builder, &mut finding, &mut history, &mut learning, "", "", "ok, soften it", false);
    futures_util::pin_mut!(stream);

    let mut saw_done = false;
    while let Some(event) = stream.next().await {
        match event {
            DiscussionStreamEvent::Token(_) => assert!(!saw_done, "token emitted after done"),
            DiscussionStreamEvent::Done { status, .. } => {
                saw_done = true;
                assert_eq!(status, lc_domain::discussion::DiscussionStatus::Revised);
            }
        }
    }
    assert!(saw_done, "stream never emitted a done event");
    assert_eq!(finding.severity, Severity::Minor);
    assert_eq!(finding.status, FindingStatus::Revised);
}
