//! Stateless Core Service (SPEC_FULL §4.9): pure orchestration routing
//! typed contract requests to the Analysis Pipeline / Discussion Engine /
//! re-evaluation engine. Holds no session state — every call is given
//! everything it needs and returns everything the caller needs to persist.

use std::collections::HashMap;
use std::time::Instant;

use lc_domain::error::{Error, Result};
use lc_domain::finding::Lens;
use lc_domain::prompt::BasicPromptBuilder;
use lc_domain::session::{LensPreferences, LensPreset};
use lc_providers::registry::ModelRegistry;
use lc_providers::{build_provider, ProviderClient};

use crate::contracts::{
    ActionType, AnalyzeRequest, AnalyzeResponse, DiscussAction, DiscussActionPayload, DiscussRequest, DiscussResponse,
    ModelConfig, ReEvaluateRequest, ReEvaluateResponse, ResponseMeta, Timings,
};

/// Resolves `model_config` to a concrete provider client, per §4.9's "the
/// service resolves it to a concrete model id and selects the
/// provider-specific client using a per-provider API key supplied in the
/// request" rule.
/// Exposed beyond this crate so the Platform Facade's streaming discussion
/// path (outside the stateless wire contract — see `lc-facade`'s
/// `session::discuss_stream`) can resolve the same provider client without
/// duplicating the provider/API-key lookup rules.
pub fn resolve_client(registry: &ModelRegistry, config: &ModelConfig) -> Result<(ProviderClient, String)> {
    let resolved = registry
        .resolve(&config.model)
        .ok_or_else(|| Error::Validation(format!("unknown model name '{}'", config.model)))?;

    let provider_key = match resolved.provider {
        lc_providers::registry::ProviderShape::Anthropic => "anthropic",
        lc_providers::registry::ProviderShape::OpenAiCompat => "openai",
    };
    let api_key = config
        .api_keys
        .get(provider_key)
        .ok_or_else(|| Error::Validation(format!("missing API key for provider '{provider_key}'")))?;

    let provider = build_provider(&resolved, api_key.clone())?;
    Ok((ProviderClient::new(provider), resolved.id))
}

fn parse_lens_preferences(wire: &crate::contracts::LensPreferencesWire, scene_count: usize) -> Result<LensPreferences> {
    let preset = match wire.preset.as_str() {
        "balanced" => LensPreset::Balanced,
        "prose-first" => LensPreset::ProseFirst,
        "story-logic" => LensPreset::StoryLogic,
        "clarity-pass" => LensPreset::ClarityPass,
        "single-scene" => LensPreset::SingleScene,
        "multi-scene" => LensPreset::MultiScene,
        "auto" => LensPreset::resolve_auto(scene_count),
        other => return Err(Error::Validation(format!("unknown lens preset '{other}'"))),
    };

    let mut overrides = HashMap::new();
    for (lens_name, weight) in &wire.weight_overrides {
        let lens = Lens::parse(lens_name).ok_or_else(|| Error::Validation(format!("unknown lens '{lens_name}'")))?;
        overrides.insert(lens, *weight);
    }

    Ok(LensPreferences::from_preset(preset).with_overrides(&overrides))
}

/// `/v1/analyze` (§4.9, §6).
pub async fn analyze(registry: &ModelRegistry, req: AnalyzeRequest) -> Result<AnalyzeResponse> {
    let started = Instant::now();
    let (client, model_used) = resolve_client(registry, &req.model_config)?;
    let prompt_builder = BasicPromptBuilder;

    // Scene count only affects `auto` preset resolution; single-scene
    // analyze requests always carry exactly one scene's text here, with
    // multi-scene concatenation owned by the Platform Facade (§4.10).
    let lens_preferences = parse_lens_preferences(&req.lens_preferences, 1)?;

    let report = lc_pipeline::analyze(
        &client,
        &prompt_builder,
        &req.scene_text,
        &req.indexes,
        req.model_config.max_tokens,
        req.model_config.max_tokens,
        &lens_preferences,
    )
    .await?;

    Ok(AnalyzeResponse {
        findings: report.findings,
        glossary_issues: report.glossary_issues,
        summary: report.summary,
        conflicts: report.conflicts,
        ambiguities: report.ambiguities,
        meta: ResponseMeta {
            model_used,
            timings: Some(Timings { total_ms: started.elapsed().as_millis() as u64 }),
            token_usage: None,
        },
    })
}

fn action_for(status: lc_domain::discussion::DiscussionStatus, preference_extracted: bool) -> DiscussAction {
    use lc_domain::discussion::DiscussionStatus as S;
    let legacy_status = format!("{status:?}").to_lowercase();

    let kind = match status {
        S::Continue if preference_extracted => ActionType::ExtractPreference,
        S::Continue | S::Accepted | S::Rejected => ActionType::Defend,
        S::Conceded | S::Withdrawn => ActionType::Withdraw,
        S::Revised => ActionType::Revise,
        S::Escalated => ActionType::Escalate,
    };

    DiscussAction {
        kind,
        payload: DiscussActionPayload { legacy_status, extracted_preference: None, ambiguity_classification: None },
    }
}

/// `/v1/discuss` (§4.9, §6). Parses and applies the tagged response itself
/// (rather than delegating to [`lc_discussion::discuss`]) so the response
/// can surface whether a `[PREFERENCE: …]` tag was present this turn —
/// `lc_discussion::discuss`'s black-box signature does not expose it.
pub async fn discuss(registry: &ModelRegistry, req: DiscussRequest) -> Result<DiscussResponse> {
    let started = Instant::now();
    let (client, model_used) = resolve_client(registry, &req.model_config)?;
    let prompt_builder = BasicPromptBuilder;

    let mut finding = req.finding;
    // `discussion_context` is the condensed history the facade builds for
    // the prompt (§4.10); `finding.discussion_turns` is the full,
    // append-only record that gets persisted, so it is never truncated
    // here.
    let context_turns = condense_for_api(&req.discussion_context);

    let system_prompt =
        prompt_builder.discussion_system_prompt(&finding, &req.scene_text, &req.prior_outcomes_summary);
    let api_message = if req.scene_changed {
        format!(
            "[NOTE: The author has edited the scene text since the last message. The updated scene is shown in \
             the system prompt. Acknowledge the changes if they are relevant to this finding.]\n\n{}",
            req.author_message
        )
    } else {
        req.author_message.clone()
    };

    let mut messages = vec![lc_domain::tool::Message::system(system_prompt)];
    for turn in &context_turns {
        messages.push(match turn.role {
            lc_domain::finding::DiscussionRole::User => lc_domain::tool::Message::user(turn.content.clone()),
            lc_domain::finding::DiscussionRole::Assistant => lc_domain::tool::Message::assistant(turn.content.clone()),
        });
    }
    messages.push(lc_domain::tool::Message::user(api_message));

    let reply = client.create_message(1024, messages).await?;
    let parsed = lc_discussion::parse_discussion_response(&reply.text);
    let preference_extracted = parsed.preference.is_some();
    let ambiguity = parsed.ambiguity;

    finding.discussion_turns.push(lc_domain::finding::DiscussionTurn {
        role: lc_domain::finding::DiscussionRole::User,
        content: req.author_message.clone(),
    });
    finding.discussion_turns.push(lc_domain::finding::DiscussionTurn {
        role: lc_domain::finding::DiscussionRole::Assistant,
        content: parsed.display_text.clone(),
    });

    lc_state::apply_discussion_outcome(&mut finding, parsed.status, &parsed.display_text, &req.author_message, parsed.revision.as_ref());

    let mut action = action_for(parsed.status, preference_extracted);
    action.payload.extracted_preference = parsed.preference;
    action.payload.ambiguity_classification = ambiguity.map(|a| format!("{a:?}").to_lowercase());

    Ok(DiscussResponse {
        assistant_response: parsed.display_text,
        action,
        updated_finding: finding,
        meta: ResponseMeta {
            model_used,
            timings: Some(Timings { total_ms: started.elapsed().as_millis() as u64 }),
            token_usage: None,
        },
    })
}

/// Keeps the last 8 turns and drops malformed entries, per §4.10's
/// "condenses discussion context" rule — applied defensively here too in
/// case a caller sends the raw, untrimmed history.
fn condense_for_api(turns: &[lc_domain::finding::DiscussionTurn]) -> Vec<lc_domain::finding::DiscussionTurn> {
    const KEEP: usize = 8;
    let well_formed: Vec<_> = turns.iter().filter(|t| !t.content.trim().is_empty()).cloned().collect();
    let start = well_formed.len().saturating_sub(KEEP);
    well_formed[start..].to_vec()
}

/// `/v1/re-evaluate-finding` (§4.9, §6).
pub async fn re_evaluate(registry: &ModelRegistry, req: ReEvaluateRequest) -> Result<ReEvaluateResponse> {
    let started = Instant::now();
    let (client, model_used) = resolve_client(registry, &req.model_config)?;
    let prompt_builder = BasicPromptBuilder;

    let mut finding = req.stale_finding;
    let numbered_scene = lc_pipeline::number_scene(&req.updated_scene_text);
    lc_pipeline::re_evaluate_finding(&client, &prompt_builder, &mut finding, &numbered_scene).await?;

    let meta = ResponseMeta {
        model_used,
        timings: Some(Timings { total_ms: started.elapsed().as_millis() as u64 }),
        token_usage: None,
    };

    if finding.status == lc_domain::finding::FindingStatus::Withdrawn {
        let reason = finding.outcome_reason.clone();
        Ok(ReEvaluateResponse::Withdrawn { reason, meta })
    } else {
        Ok(ReEvaluateResponse::Updated { finding, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::discussion::DiscussionStatus;
    use lc_domain::finding::{DiscussionRole, DiscussionTurn};

    fn config(model: &str, keys: &[(&str, &str)]) -> ModelConfig {
        ModelConfig {
            model: model.to_string(),
            api_keys: keys.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            max_tokens: 4096,
            provider_options: None,
        }
    }

    #[test]
    fn resolve_client_rejects_unknown_model_name() {
        let registry = ModelRegistry::new();
        let err = resolve_client(&registry, &config("nonexistent-model", &[])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn resolve_client_rejects_missing_provider_api_key() {
        let registry = ModelRegistry::new();
        let err = resolve_client(&registry, &config("sonnet", &[("openai", "sk-wrong-provider")])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn resolve_client_succeeds_with_matching_provider_key() {
        let registry = ModelRegistry::new();
        let (_, model_used) = resolve_client(&registry, &config("sonnet", &[("anthropic", "sk-test")])).unwrap();
        assert_eq!(model_used, "claude-sonnet-4-20250514");
    }

    #[test]
    fn action_mapping_defends_on_continue_without_preference() {
        let action = action_for(DiscussionStatus::Continue, false);
        assert!(matches!(action.kind, ActionType::Defend));
        assert_eq!(action.payload.legacy_status, "continue");
    }

    #[test]
    fn action_mapping_extracts_preference_when_tag_present_during_continue() {
        let action = action_for(DiscussionStatus::Continue, true);
        assert!(matches!(action.kind, ActionType::ExtractPreference));
    }

    #[test]
    fn action_mapping_withdraws_on_conceded() {
        let action = action_for(DiscussionStatus::Conceded, false);
        assert!(matches!(action.kind, ActionType::Withdraw));
        assert_eq!(action.payload.legacy_status, "conceded");
    }

    #[test]
    fn action_mapping_revises_and_escalates() {
        assert!(matches!(action_for(DiscussionStatus::Revised, false).kind, ActionType::Revise));
        assert!(matches!(action_for(DiscussionStatus::Escalated, false).kind, ActionType::Escalate));
    }

    fn turn(role: DiscussionRole, content: &str) -> DiscussionTurn {
        DiscussionTurn { role, content: content.to_string() }
    }

    #[test]
    fn condense_for_api_keeps_only_last_eight_turns() {
        let turns: Vec<DiscussionTurn> =
            (0..20).map(|i| turn(DiscussionRole::User, &format!("turn {i}"))).collect();
        let condensed = condense_for_api(&turns);
        assert_eq!(condensed.len(), 8);
        assert_eq!(condensed[0].content, "turn 12");
        assert_eq!(condensed[7].content, "turn 19");
    }

    #[test]
    fn condense_for_api_filters_malformed_blank_entries() {
        let turns = vec![
            turn(DiscussionRole::User, "real message"),
            turn(DiscussionRole::Assistant, "   "),
            turn(DiscussionRole::User, "another real message"),
        ];
        let condensed = condense_for_api(&turns);
        assert_eq!(condensed.len(), 2);
    }

    #[test]
    fn lens_preferences_auto_resolves_by_scene_count() {
        let wire = crate::contracts::LensPreferencesWire { preset: "auto".to_string(), weight_overrides: HashMap::new() };
        let single = parse_lens_preferences(&wire, 1).unwrap();
        let multi = parse_lens_preferences(&wire, 3).unwrap();
        assert_eq!(single.preset, LensPreset::SingleScene);
        assert_eq!(multi.preset, LensPreset::MultiScene);
    }

    #[test]
    fn lens_preferences_rejects_unknown_preset_and_lens() {
        let bad_preset =
            crate::contracts::LensPreferencesWire { preset: "nonexistent".to_string(), weight_overrides: HashMap::new() };
        assert!(parse_lens_preferences(&bad_preset, 1).is_err());

        let mut overrides = HashMap::new();
        overrides.insert("not-a-lens".to_string(), 1.0);
        let bad_lens = crate::contracts::LensPreferencesWire { preset: "balanced".to_string(), weight_overrides: overrides };
        assert!(parse_lens_preferences(&bad_lens, 1).is_err());
    }
}
