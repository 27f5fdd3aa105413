//! `lit-critic analyze` — starts a brand new multi-lens review session.
//! Modeled on `original_source/cli/commands.py::cmd_analyze`, minus its
//! integer-id bookkeeping (sessions are addressed by UUID here).

use std::path::PathBuf;
use std::sync::Arc;

use lc_facade::{repo_preflight, SessionManager};
use lc_providers::registry::ModelRegistry;

use super::prompt::Prompter;
use super::review;

pub async fn run(
    scenes: Vec<String>,
    project: String,
    model: String,
    discussion_model: Option<String>,
    lens_preset: String,
    lens_weight: Vec<String>,
) -> crate::error::Result<()> {
    let project_path = repo_preflight::validate_repo_path(&project)?;
    let weight_overrides = super::parse_lens_weight_overrides(&lens_weight)?;
    let project_config = crate::config::Config::load(&project_path)?;
    let discussion_model = discussion_model.or_else(|| project_config.model.discussion_model.clone());

    let registry = Arc::new(ModelRegistry::new());
    let core_client = super::new_core_client(Arc::clone(&registry));
    let manager = SessionManager::open(&project_path, core_client)?;

    if let Some(active) = manager.resume_session()? {
        println!("\nAn active session already exists for this project ({} findings, started {}).", active.findings.len(), active.created_at.format("%Y-%m-%d %H:%M"));
        let answer = Prompter::new()?
            .read("Complete it, discard it, or abort this analyze? [complete/discard/abort] ")
            .unwrap_or_else(|| "abort".to_string());
        match answer.to_ascii_lowercase().as_str() {
            "complete" => {
                manager.complete_session(active.session_id)?;
            }
            "discard" => {
                manager.abandon_session(active.session_id)?;
            }
            _ => {
                println!("Aborted. Nothing changed.");
                return Ok(());
            }
        }
    }

    let max_tokens = project_config.model.max_tokens;
    let config = super::model_config(&model, max_tokens);
    let report = manager
        .start_session(scenes.clone(), config, discussion_model, &lens_preset, weight_overrides)
        .await?;

    review::print_summary(&report.glossary_issues().to_vec(), &report.summary, &report.conflicts, &report.ambiguities);

    let learning = manager.load_learning()?;
    let scene_text = load_concatenated_scene_text(&scenes)?;
    review::run(&manager, report.session, learning, &scene_text, super::model_config(&model, max_tokens)).await
}

/// Rebuilds the exact same concatenated text `start_session` hashed, so the
/// review loop's scene-change detection compares against a matching baseline.
fn load_concatenated_scene_text(scenes: &[String]) -> crate::error::Result<String> {
    let docs: Vec<(String, String)> = scenes
        .iter()
        .map(|p| lc_facade::indexes::load_scene_text(&PathBuf::from(p)).map(|text| (p.clone(), text)))
        .collect::<lc_domain::error::Result<_>>()?;
    let (concatenated, _line_map) = lc_facade::scenes::concatenate_scenes(&docs);
    Ok(concatenated)
}
