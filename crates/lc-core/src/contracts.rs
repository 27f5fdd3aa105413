//! Wire request/response schemas for the three endpoints SPEC_FULL §4.9 and
//! §6 name. Every struct rejects unknown fields — the "replace dynamic JSON
//! validation with explicit typed structs" redesign flag in SPEC_FULL §9.
//!
//! These types are transport-agnostic: [`crate::routes`] is the only module
//! that knows they travel over HTTP/JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lc_domain::finding::Finding;
use lc_domain::prompt::Indexes;

/// `{analysis_model, api_keys, max_tokens, provider_options?}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Short model name (`sonnet`, `gpt-4o`, …); resolved to a concrete
    /// model id and provider by the registry.
    pub model: String,
    /// Per-provider API keys, keyed by the provider id the registry
    /// resolves to (`"anthropic"` / `"openai"`). No ambient credentials are
    /// consulted inside the core (§4.9).
    pub api_keys: HashMap<String, String>,
    pub max_tokens: u32,
    #[serde(default)]
    pub provider_options: Option<serde_json::Value>,
}

/// `meta` block every endpoint's response carries (§4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseMeta {
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timings {
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// /v1/analyze
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeRequest {
    pub scene_text: String,
    #[serde(default)]
    pub indexes: Indexes,
    #[serde(default)]
    pub learning_context: Option<serde_json::Value>,
    pub model_config: ModelConfig,
    /// Lens preference preset + weight overrides (SPEC_FULL §4.2.1); the
    /// caller resolves `auto` before sending, since only the Platform
    /// Facade knows the session's scene count.
    pub lens_preferences: LensPreferencesWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LensPreferencesWire {
    pub preset: String,
    #[serde(default)]
    pub weight_overrides: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeResponse {
    pub findings: Vec<Finding>,
    pub glossary_issues: Vec<String>,
    pub summary: serde_json::Map<String, serde_json::Value>,
    pub conflicts: Vec<String>,
    pub ambiguities: Vec<String>,
    pub meta: ResponseMeta,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// /v1/discuss
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscussRequest {
    pub scene_text: String,
    pub finding: Finding,
    /// Condensed discussion context — the facade keeps the last N turns
    /// and filters malformed entries before this ever reaches the core
    /// (§4.10); the core itself applies no further trimming.
    pub discussion_context: Vec<lc_domain::finding::DiscussionTurn>,
    pub prior_outcomes_summary: String,
    pub author_message: String,
    #[serde(default)]
    pub scene_changed: bool,
    pub model_config: ModelConfig,
}

/// `action.type` ∈ {defend, withdraw, revise, escalate, extract_preference}
/// (§6); `legacy_status` carries the concrete §4.4 tag for callers still
/// keyed on the old status vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Defend,
    Withdraw,
    Revise,
    Escalate,
    ExtractPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscussAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    pub payload: DiscussActionPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscussActionPayload {
    pub legacy_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity_classification: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscussResponse {
    pub assistant_response: String,
    pub action: DiscussAction,
    pub updated_finding: Finding,
    pub meta: ResponseMeta,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// /v1/re-evaluate-finding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReEvaluateRequest {
    pub stale_finding: Finding,
    pub updated_scene_text: String,
    #[serde(default)]
    pub minimal_context: Indexes,
    pub model_config: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", deny_unknown_fields)]
pub enum ReEvaluateResponse {
    Updated { finding: Finding, meta: ResponseMeta },
    Withdrawn { reason: String, meta: ResponseMeta },
}
