//! Analysis Pipeline (SPEC_FULL §4.2): fans six lens calls out in parallel,
//! coordinates their outputs into a single deduplicated, prioritised
//! finding list, and re-evaluates individual findings against edited scene
//! text.
//!
//! Grounded on `original_source/lit_platform/runtime/api.py`'s
//! `run_analysis`, `run_coordinator_chunked`, `run_coordinator`, and
//! `re_evaluate_finding`.

mod convert;
mod coordinator;
mod dedup;
mod lens;
mod line_numbering;
mod reeval;
mod rerank;
mod tool_schema;
mod validator;

pub use coordinator::{run_coordinator, run_coordinator_chunked, CoordinatorOutput, COORDINATOR_MAX_RETRIES};
pub use lens::{run_all_lenses, run_lens, LensOutcome};
pub use line_numbering::number_scene;
pub use reeval::re_evaluate_finding;
pub use rerank::rerank;
pub use validator::validate_coordinator_output;

use lc_domain::error::Result;
use lc_domain::prompt::{Indexes, PromptBuilder};
use lc_domain::session::LensPreferences;
use lc_providers::LlmClient;

/// The result of one full `Analyze` call (SPEC_FULL §4.2's operation
/// signature).
pub type AnalysisReport = CoordinatorOutput;

/// Runs all six lenses, coordinates (chunked, falling back to single-call
/// on total chunk failure), and re-ranks by lens preferences.
///
/// `max_tokens` bounds each lens call; `coordinator_max_tokens` bounds each
/// coordinator call (chunk or single-call fallback).
pub async fn analyze(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    scene_text: &str,
    indexes: &Indexes,
    max_tokens: u32,
    coordinator_max_tokens: u32,
    lens_preferences: &LensPreferences,
) -> Result<AnalysisReport> {
    let numbered_scene = number_scene(scene_text);

    tracing::info!("running 6 lenses in parallel");
    let lens_results = run_all_lenses(client, prompt_builder, &numbered_scene, indexes, max_tokens).await;
    for result in &lens_results {
        match &result.error {
            Some(err) => tracing::warn!(lens = %result.lens, error = %err, "lens failed"),
            None => tracing::debug!(lens = %result.lens, "lens complete"),
        }
    }

    tracing::info!("coordinating results (chunked: prose -> structure -> coherence)");
    let mut report = match run_coordinator_chunked(client, prompt_builder, &lens_results, &numbered_scene, coordinator_max_tokens).await
    {
        Ok(report) => report,
        Err(_) => {
            tracing::warn!("chunked coordinator failed; falling back to single-call coordinator");
            run_coordinator(
                client,
                prompt_builder,
                &lens_results,
                &numbered_scene,
                coordinator_max_tokens,
                COORDINATOR_MAX_RETRIES,
            )
            .await?
        }
    };

    report.findings = rerank(report.findings, lens_preferences);
    Ok(report)
}

#[cfg(test)]
mod tests;
