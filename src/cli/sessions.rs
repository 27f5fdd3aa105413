//! `lit-critic sessions` — list/view/delete saved sessions for a project.
//! Modeled on `original_source/cli/commands.py::cmd_sessions`, adapted from
//! integer session ids to this crate's UUID-keyed sessions.

use std::sync::Arc;

use uuid::Uuid;

use lc_facade::{repo_preflight, SessionManager};
use lc_providers::registry::ModelRegistry;

use super::SessionsCommand;

pub fn run(action: SessionsCommand) -> crate::error::Result<()> {
    match action {
        SessionsCommand::List { project } => list(&project),
        SessionsCommand::View { id, project } => view(&id, &project),
        SessionsCommand::Delete { id, project } => delete(&id, &project),
    }
}

fn open_manager(project: &str) -> crate::error::Result<SessionManager> {
    let project_path = repo_preflight::validate_repo_path(project)?;
    let registry = Arc::new(ModelRegistry::new());
    let core_client = super::new_core_client(registry);
    Ok(SessionManager::open(&project_path, core_client)?)
}

fn list(project: &str) -> crate::error::Result<()> {
    let manager = open_manager(project)?;
    let sessions = manager.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions for this project.");
        return Ok(());
    }

    println!("{:<38} {:<10} {:<9} {:<20} {}", "ID", "STATUS", "FINDINGS", "STARTED", "SCENE(S)");
    for session in &sessions {
        let status = format!("{:?}", session.status).to_lowercase();
        println!(
            "{:<38} {:<10} {:<9} {:<20} {}",
            session.session_id,
            status,
            session.findings.len(),
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.scene_paths.join(", "),
        );
    }
    Ok(())
}

fn view(id: &str, project: &str) -> crate::error::Result<()> {
    let session_id = parse_uuid(id)?;
    let manager = open_manager(project)?;
    let Some(session) = manager.get_session(session_id)? else {
        println!("No session found with id {id}.");
        return Ok(());
    };

    println!("Session {}", session.session_id);
    println!("  Status:    {:?}", session.status);
    println!("  Model:     {}", session.model);
    println!("  Scene(s):  {}", session.scene_paths.join(", "));
    println!("  Started:   {}", session.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(completed) = session.completed_at {
        println!("  Completed: {}", completed.format("%Y-%m-%d %H:%M"));
    }
    println!(
        "  Findings:  {} total, {} accepted, {} rejected, {} withdrawn",
        session.counters.total, session.counters.accepted, session.counters.rejected, session.counters.withdrawn
    );
    if !session.glossary_issues.is_empty() {
        println!("  Glossary issues:");
        for issue in &session.glossary_issues {
            println!("    • {issue}");
        }
    }
    println!();
    for finding in &session.findings {
        println!(
            "  #{:<3} {:<9} {:<10} {:<60} [{:?}]",
            finding.number,
            finding.severity.to_string(),
            finding.lens.as_str(),
            truncate(&finding.evidence, 60),
            finding.status,
        );
    }
    Ok(())
}

fn delete(id: &str, project: &str) -> crate::error::Result<()> {
    let session_id = parse_uuid(id)?;
    let manager = open_manager(project)?;
    if manager.delete_session(session_id)? {
        println!("Deleted session {id}.");
    } else {
        println!("No session found with id {id}.");
    }
    Ok(())
}

fn parse_uuid(id: &str) -> crate::error::Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| crate::error::Error::Config(format!("'{id}' is not a valid session id")))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
