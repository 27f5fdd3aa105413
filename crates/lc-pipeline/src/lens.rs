//! Parallel lens dispatch (SPEC_FULL §4.2 step 2). Grounded on
//! `original_source/lit_platform/runtime/api.py::run_lens`.

use lc_domain::finding::Lens;
use lc_domain::prompt::{Indexes, PromptBuilder};
use lc_domain::tool::Message;
use lc_providers::LlmClient;

/// The outcome of one lens call: either its raw text output, or an error
/// string when the call failed. A failed lens does not fail the pipeline —
/// the coordinator simply sees one fewer contributor for its chunk.
#[derive(Debug, Clone)]
pub struct LensOutcome {
    pub lens: Lens,
    pub raw_output: String,
    pub error: Option<String>,
}

pub async fn run_lens(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    lens: Lens,
    numbered_scene: &str,
    indexes: &Indexes,
    max_tokens: u32,
) -> LensOutcome {
    let prompt = prompt_builder.lens_prompt(lens, numbered_scene, indexes);
    match client.create_message(max_tokens, vec![Message::user(prompt)]).await {
        Ok(reply) => LensOutcome { lens, raw_output: reply.text, error: None },
        Err(e) => LensOutcome { lens, raw_output: String::new(), error: Some(e.to_string()) },
    }
}

/// Fans all six lenses out in parallel, awaiting every one before
/// returning (SPEC_FULL §5's "cooperative, single-process" scheduling
/// model — the pipeline is the only place concurrent work happens).
pub async fn run_all_lenses(
    client: &dyn LlmClient,
    prompt_builder: &dyn PromptBuilder,
    numbered_scene: &str,
    indexes: &Indexes,
    max_tokens: u32,
) -> Vec<LensOutcome> {
    let futures = Lens::ALL.into_iter().map(|lens| run_lens(client, prompt_builder, lens, numbered_scene, indexes, max_tokens));
    futures_util::future::join_all(futures).await
}
