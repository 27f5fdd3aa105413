//! Discussion Engine (SPEC_FULL §4.4): one LLM call per turn of the
//! author/critic dialogue about a single finding, with a streaming
//! variant.
//!
//! Grounded on `original_source/server/discussion.py`'s `handle_discussion`
//! and `handle_discussion_stream`.

mod effects;
mod parse;

pub use effects::apply_side_effects;
pub use parse::{parse_discussion_response, ParsedResponse};

use futures_core::Stream;

use lc_domain::discussion::DiscussionStatus;
use lc_domain::finding::{DiscussionRole, DiscussionTurn, Finding};
use lc_domain::learning::Learning;
use lc_domain::prompt::PromptBuilder;
use lc_domain::tool::Message;
use lc_providers::LlmClient;

const DISCUSSION_MAX_TOKENS: u32 = 1024;

const SCENE_EDITED_NOTE: &str = "[NOTE: The author has edited the scene text since the last message. \
The updated scene is shown in the system prompt. Acknowledge the changes if they are relevant to \
this finding.]\n\n";

fn api_message_for(user_message: &str, scene_changed: bool) -> String {
    if scene_changed {
        format!("{SCENE_EDITED_NOTE}{user_message}")
    } else {
        user_message.to_string()
    }
}

fn build_messages(system_prompt: &str, finding: &Finding, api_message: &str) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt)];
    for turn in &finding.discussion_turns {
        messages.push(match turn.role {
            DiscussionRole::User => Message::user(turn.content.clone()),
            DiscussionRole::Assistant => Message::assistant(turn.content.clone()),
        });
    }
    messages.push(Message::user(api_message.to_string()));
    messages
}

/// One round of author/critic discussion about `finding`. On an LLM
/// failure, returns a `continue` status with a visible error message and
/// applies no side effects — matching the source's "discussion never
/// corrupts state on a transient failure" behavior.
pub async fn discuss(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    finding: &mut Finding,
    discussion_history: &mut Vec<DiscussionTurn>,
    learning: &mut Learning,
    numbered_scene: &str,
    prior_outcomes_summary: &str,
    user_message: &str,
    scene_changed: bool,
) -> (String, DiscussionStatus) {
    let system_prompt = prompt_builder.discussion_system_prompt(finding, numbered_scene, prior_outcomes_summary);
    let api_message = api_message_for(user_message, scene_changed);
    let messages = build_messages(&system_prompt, finding, &api_message);

    match client.create_message(DISCUSSION_MAX_TOKENS, messages).await {
        Ok(reply) => {
            let parsed = parse_discussion_response(&reply.text);
            apply_side_effects(finding, discussion_history, learning, user_message, parsed)
        }
        Err(e) => (format!("[Discussion error: {e}]"), DiscussionStatus::Continue),
    }
}

/// A streaming event from [`discuss_stream`]: interleaved text tokens
/// followed by exactly one terminal `Done`.
#[derive(Debug, Clone)]
pub enum DiscussionStreamEvent {
    Token(String),
    Done { response: String, status: DiscussionStatus },
}

/// Streaming variant of [`discuss`]. Side effects are applied once the
/// underlying stream completes, immediately before the terminal `Done`
/// event is yielded.
pub fn discuss_stream<'a>(
    client: &'a dyn LlmClient,
    prompt_builder: &'a dyn PromptBuilder,
    finding: &'a mut Finding,
    discussion_history: &'a mut Vec<DiscussionTurn>,
    learning: &'a mut Learning,
    numbered_scene: &'a str,
    prior_outcomes_summary: &'a str,
    user_message: &'a str,
    scene_changed: bool,
) -> impl Stream<Item = DiscussionStreamEvent> + 'a {
    async_stream::stream! {
        let system_prompt = prompt_builder.discussion_system_prompt(finding, numbered_scene, prior_outcomes_summary);
        let api_message = api_message_for(user_message, scene_changed);
        let messages = build_messages(&system_prompt, finding, &api_message);

        let stream_result = client.stream_message(DISCUSSION_MAX_TOKENS, messages).await;
        let mut chunks = match stream_result {
            Ok(chunks) => chunks,
            Err(e) => {
                yield DiscussionStreamEvent::Done {
                    response: format!("[Discussion error: {e}]"),
                    status: DiscussionStatus::Continue,
                };
                return;
            }
        };

        let mut raw_response = String::new();
        let mut stream_error: Option<String> = None;
        use futures_util::StreamExt;
        loop {
            let next = chunks.next().await;
            let Some(item) = next else { break };
            match item {
                Ok(lc_providers::StreamChunk::Text(text)) => {
                    yield DiscussionStreamEvent::Token(text);
                }
                Ok(lc_providers::StreamChunk::Done { text, .. }) => {
                    raw_response = text;
                }
                Err(e) => {
                    stream_error = Some(e.to_string());
                    break;
                }
            }
        }

        if let Some(err) = stream_error {
            yield DiscussionStreamEvent::Done { response: format!("[Discussion error: {err}]"), status: DiscussionStatus::Continue };
            return;
        }

        let parsed = parse_discussion_response(&raw_response);
        let (response_text, status) = apply_side_effects(finding, discussion_history, learning, user_message, parsed);
        yield DiscussionStreamEvent::Done { response: response_text, status };
    }
}

#[cfg(test)]
mod tests;
