//! `lit-critic resume` — reopens the project's active session.
//! Modeled on `original_source/cli/commands.py::cmd_resume`.

use std::path::PathBuf;
use std::sync::Arc;

use lc_facade::{repo_preflight, SessionManager};
use lc_providers::registry::ModelRegistry;

use super::prompt::Prompter;
use super::review;

pub async fn run(project: String, model: String) -> crate::error::Result<()> {
    let project_path = repo_preflight::validate_repo_path(&project)?;
    let project_config = crate::config::Config::load(&project_path)?;

    let registry = Arc::new(ModelRegistry::new());
    let core_client = super::new_core_client(Arc::clone(&registry));
    let manager = SessionManager::open(&project_path, core_client)?;

    let Some(session) = manager.resume_session()? else {
        println!("No active session for this project. Run 'lit-critic analyze' to start one.");
        return Ok(());
    };

    let scene_text = match load_concatenated_scene_text(&session.scene_paths) {
        Ok(text) => text,
        Err(_) => {
            println!(
                "\nOne or more scene files from the saved session could not be found:\n  {}",
                session.scene_paths.join("\n  ")
            );
            let answer = Prompter::new()?.read("Enter corrected paths (comma-separated), or press Enter to abort: ");
            match answer.filter(|s| !s.is_empty()) {
                Some(paths) => {
                    let corrected: Vec<String> = paths.split(',').map(|s| s.trim().to_string()).collect();
                    load_concatenated_scene_text(&corrected)?
                }
                None => {
                    println!("Aborted.");
                    return Ok(());
                }
            }
        }
    };

    if let Some(mismatch) = SessionManager::validate_scene_state(&session, &scene_text, &session.scene_paths) {
        println!("\n⚠ Scene state check: {mismatch}");
        println!("  Continuing anyway — the review loop will reconcile line-level drift as it goes.");
    }

    let learning = manager.load_learning_for_session(session.session_id)?;
    println!("\nResuming session for {} (model: {}).", session.scene_paths.join(", "), session.model);
    review::run(&manager, session, learning, &scene_text, super::model_config(&model, project_config.model.max_tokens)).await
}

/// Rebuilds the exact same concatenated text the session's `scene_hash` was
/// computed against, so [`SessionManager::validate_scene_state`] and the
/// review loop's scene-change detection compare against a matching baseline.
fn load_concatenated_scene_text(scenes: &[String]) -> crate::error::Result<String> {
    let docs: Vec<(String, String)> = scenes
        .iter()
        .map(|p| lc_facade::indexes::load_scene_text(&PathBuf::from(p)).map(|text| (p.clone(), text)))
        .collect::<lc_domain::error::Result<_>>()?;
    let (concatenated, _line_map) = lc_facade::scenes::concatenate_scenes(&docs);
    Ok(concatenated)
}
