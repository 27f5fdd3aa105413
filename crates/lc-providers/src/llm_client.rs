//! Provider-agnostic client surface exposed to upper layers.
//!
//! Upper layers (the analysis pipeline, the discussion engine) never touch
//! [`crate::traits::LlmProvider`] or a concrete adapter directly. They call
//! [`LlmClient`], which is expressed purely in terms of the three operations
//! SPEC_FULL §4.1 names and hides the mechanical per-provider translations
//! (system-prompt side channel vs. leading message, tool schema envelope,
//! truncation signal).

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;

use lc_domain::error::{Error, Result};
use lc_domain::stream::{BoxStream, StreamEvent};
use lc_domain::tool::{Message, ToolDefinition};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::registry::{ProviderShape, ResolvedModel};
use crate::traits::{ChatRequest, LlmProvider};

/// Plain-text completion result.
#[derive(Debug, Clone)]
pub struct TextReply {
    pub text: String,
    pub truncated: bool,
}

/// Forced-tool-call completion result.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub tool_input: Value,
    pub truncated: bool,
    pub raw_text: String,
}

/// One element of a `stream_message` sequence: either an incremental text
/// chunk, or the terminal `{text, truncated}` pair.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    Text(String),
    Done { text: String, truncated: bool },
}

/// Construct the provider adapter for a resolved model, authenticated with
/// a caller-supplied API key. No ambient credentials are consulted here.
pub fn build_provider(
    model: &ResolvedModel,
    api_key: impl Into<String>,
) -> Result<Arc<dyn LlmProvider>> {
    let api_key = api_key.into();
    match model.provider {
        ProviderShape::Anthropic => {
            let provider = AnthropicProvider::new(
                model.id.clone(),
                "https://api.anthropic.com",
                api_key,
                Some(model.id.clone()),
            )?;
            Ok(Arc::new(provider))
        }
        ProviderShape::OpenAiCompat => {
            let provider = OpenAiCompatProvider::new(
                model.id.clone(),
                "https://api.openai.com/v1",
                api_key,
                Some(model.id.clone()),
            )?;
            Ok(Arc::new(provider))
        }
    }
}

/// The three-operation client surface named in SPEC_FULL §4.1.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_message(&self, max_tokens: u32, messages: Vec<Message>) -> Result<TextReply>;

    async fn create_message_with_tool(
        &self,
        max_tokens: u32,
        messages: Vec<Message>,
        tool_schema: ToolDefinition,
        tool_name: &str,
    ) -> Result<ToolReply>;

    /// Stream text chunks, terminated by a final `{text, truncated}` pair.
    async fn stream_message(
        &self,
        max_tokens: u32,
        messages: Vec<Message>,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>>;
}

/// Blanket [`LlmClient`] over any [`LlmProvider`] adapter.
pub struct ProviderClient {
    provider: Arc<dyn LlmProvider>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl LlmClient for ProviderClient {
    async fn create_message(&self, max_tokens: u32, messages: Vec<Message>) -> Result<TextReply> {
        let req = ChatRequest {
            messages,
            max_tokens: Some(max_tokens),
            ..Default::default()
        };
        let resp = self.provider.chat(req).await?;
        Ok(TextReply {
            text: resp.content,
            truncated: resp.truncated,
        })
    }

    async fn create_message_with_tool(
        &self,
        max_tokens: u32,
        messages: Vec<Message>,
        tool_schema: ToolDefinition,
        tool_name: &str,
    ) -> Result<ToolReply> {
        let req = ChatRequest {
            messages,
            tools: vec![tool_schema],
            force_tool: Some(tool_name.to_string()),
            max_tokens: Some(max_tokens),
            ..Default::default()
        };
        let resp = self.provider.chat(req).await?;

        let call = resp
            .tool_calls
            .into_iter()
            .find(|c| c.tool_name == tool_name)
            .ok_or_else(|| Error::Provider {
                provider: self.provider.provider_id().to_string(),
                message: format!("model did not call forced tool '{tool_name}'"),
            })?;

        Ok(ToolReply {
            tool_input: call.arguments,
            truncated: resp.truncated,
            raw_text: resp.content,
        })
    }

    async fn stream_message(
        &self,
        max_tokens: u32,
        messages: Vec<Message>,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let req = ChatRequest {
            messages,
            max_tokens: Some(max_tokens),
            ..Default::default()
        };
        let inner = self.provider.chat_stream(req).await?;

        let mut accumulated = String::new();
        let chunk_stream = inner.filter_map(move |event| {
            let result = match event {
                Ok(StreamEvent::Token { text }) => {
                    accumulated.push_str(&text);
                    Some(Ok(StreamChunk::Text(text)))
                }
                Ok(StreamEvent::Done { finish_reason, .. }) => {
                    let truncated = finish_reason.as_deref() == Some("length")
                        || finish_reason.as_deref() == Some("max_tokens");
                    Some(Ok(StreamChunk::Done {
                        text: accumulated.clone(),
                        truncated,
                    }))
                }
                Ok(StreamEvent::Error { message }) => Some(Err(Error::Provider {
                    provider: "stream".into(),
                    message,
                })),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            };
            async move { result }
        });

        Ok(Box::pin(chunk_stream))
    }
}
