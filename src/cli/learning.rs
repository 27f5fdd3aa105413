//! `lit-critic learning` — inspect, export, or reset a project's
//! accumulated learning. Modeled on `original_source/cli/commands.py::cmd_learning`.

use std::sync::Arc;

use lc_domain::learning::LearningCategory;
use lc_facade::{repo_preflight, SessionManager};
use lc_providers::registry::ModelRegistry;

use super::prompt::Prompter;
use super::LearningCommand;

pub fn run(action: LearningCommand) -> crate::error::Result<()> {
    match action {
        LearningCommand::View { project } => view(&project),
        LearningCommand::Export { project } => export(&project),
        LearningCommand::Reset { project } => reset(&project),
    }
}

fn open_manager(project: &str) -> crate::error::Result<SessionManager> {
    let project_path = repo_preflight::validate_repo_path(project)?;
    let registry = Arc::new(ModelRegistry::new());
    let core_client = super::new_core_client(registry);
    Ok(SessionManager::open(&project_path, core_client)?)
}

fn view(project: &str) -> crate::error::Result<()> {
    let manager = open_manager(project)?;
    let learning = manager.load_learning()?;

    println!("Reviews completed: {}", learning.review_count);
    for category in LearningCategory::ALL {
        let entries = learning.category(category);
        println!("\n{}", category.heading());
        if entries.is_empty() {
            println!("  (none)");
        } else {
            for entry in entries {
                println!("  [{}] {}", entry.id, entry.description);
            }
        }
    }
    Ok(())
}

fn export(project: &str) -> crate::error::Result<()> {
    let project_path = repo_preflight::validate_repo_path(project)?;
    let manager = open_manager(project)?;
    let markdown = manager.export_learning_markdown()?;
    let path = project_path.join("LEARNING.md");
    std::fs::write(&path, markdown)?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn reset(project: &str) -> crate::error::Result<()> {
    let manager = open_manager(project)?;
    let answer = Prompter::new()?
        .read("This will permanently delete all learning data for this project. Continue? [y/N] ")
        .unwrap_or_default();
    if answer.trim().eq_ignore_ascii_case("y") {
        manager.reset_learning()?;
        println!("Learning data reset.");
    } else {
        println!("Aborted.");
    }
    Ok(())
}
