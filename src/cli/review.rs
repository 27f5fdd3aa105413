//! The interactive finding-by-finding review loop (§4.5's navigation, §4.7's
//! scene-change detection, §4.4's discussion engine), auto-saving after
//! every mutation. Modeled on `original_source/cli/session_loop.py` and its
//! `interface.py` display helpers.

use std::io::Write;

use lc_core::contracts::ModelConfig;
use lc_domain::finding::{AmbiguityType, Finding, FindingStatus};
use lc_domain::learning::Learning;
use lc_domain::session::Session;
use lc_facade::SessionManager;
use lc_state::LensNavigationTarget;

use super::prompt::Prompter;

/// Runs the interactive loop starting at `session.current_index`, returning
/// once the session is completed, paused (quit), or EOF is reached on
/// stdin. Mirrors `run_interactive_session`'s recursion-on-unresolved
/// behavior with a plain loop instead.
pub async fn run(
    manager: &SessionManager,
    mut session: Session,
    mut learning: Learning,
    scene_text: &str,
    model_config: ModelConfig,
) -> crate::error::Result<()> {
    if session.findings.is_empty() {
        println!("\nNo findings to discuss. The scene looks good!");
        manager.complete_session(session.session_id)?;
        return Ok(());
    }

    let mut prompter = Prompter::new()?;

    loop {
        let mut skip_to_lens: Option<LensNavigationTarget> = None;
        let mut current = session.current_index;

        if current > 0 {
            let processed = session.findings[..current.min(session.findings.len())]
                .iter()
                .filter(|f| f.status != FindingStatus::Pending)
                .count();
            println!("\n[Resuming: {processed} findings processed, starting at #{}]", current + 1);
        }

        'findings: while current < session.findings.len() {
            if let Some(report) =
                manager.detect_and_apply_scene_changes(session.session_id, &mut session, current, scene_text, model_config.clone()).await?
            {
                print_scene_change_report(&report);
            }

            if session.findings[current].status == FindingStatus::Withdrawn {
                current += 1;
                manager.update_current_index(session.session_id, current)?;
                continue;
            }

            if let Some(target) = skip_to_lens {
                let next = lc_state::next_index_for_lens(&session.findings, current.saturating_sub(1), target);
                if next != current {
                    current = next;
                    manager.update_current_index(session.session_id, current)?;
                    continue;
                }
                skip_to_lens = None;
            }

            if current >= session.findings.len() {
                break 'findings;
            }

            let total = session.findings.len();
            print_finding(&session.findings[current], current + 1, total);

            loop {
                let user_input = match prompter.read("\n> ") {
                    Some(s) => s,
                    None => {
                        println!("\n\nSession paused (auto-saved).");
                        return Ok(());
                    }
                };
                let lower = user_input.to_ascii_lowercase();

                match lower.as_str() {
                    "continue" | "c" | "" => {
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "review" => {
                        if let Some(report) = manager
                            .detect_and_apply_scene_changes(session.session_id, &mut session, current, scene_text, model_config.clone())
                            .await?
                        {
                            print_scene_change_report(&report);
                        } else {
                            println!("\n[Review] No scene changes detected.");
                        }
                        print_finding(&session.findings[current], current + 1, total);
                    }
                    "skip to structure" => {
                        skip_to_lens = Some(LensNavigationTarget::Structure);
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "skip to coherence" => {
                        skip_to_lens = Some(LensNavigationTarget::Coherence);
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "quit" | "q" | "exit" => {
                        println!("\nSession paused (auto-saved). Resume anytime with:");
                        println!("  lit-critic resume --project {}", first_scene_project_hint(&session));
                        return Ok(());
                    }
                    "accept" => {
                        manager.accept_finding(session.session_id, &mut session.findings[current], &mut learning)?;
                        println!("\n[Finding accepted. Moving to next.]");
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "reject" => {
                        let reason = prompter.read("Reason (brief): ").unwrap_or_default();
                        manager.reject_finding(session.session_id, &mut session.findings[current], &mut learning, &reason)?;
                        println!("\n[Finding rejected. Moving to next.]");
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "intentional" if session.findings[current].ambiguity_type.is_some() => {
                        lc_state::record_ambiguity_answer(&session.findings[current], &mut learning, true);
                        manager.commit_learning(&mut learning)?;
                        println!("\n[Marked as intentional ambiguity. Moving to next.]");
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "accidental" if session.findings[current].ambiguity_type.is_some() => {
                        lc_state::record_ambiguity_answer(&session.findings[current], &mut learning, false);
                        manager.commit_learning(&mut learning)?;
                        println!("\n[Marked as accidental confusion. Moving to next.]");
                        current += 1;
                        manager.update_current_index(session.session_id, current)?;
                        break;
                    }
                    "export learning" => {
                        let markdown = manager.export_learning_markdown()?;
                        let path = std::path::Path::new(&session.scene_paths[0])
                            .parent()
                            .map(|p| p.join("LEARNING.md"))
                            .unwrap_or_else(|| std::path::PathBuf::from("LEARNING.md"));
                        std::fs::write(&path, markdown)?;
                        println!("\n  ✓ Exported to {}", path.display());
                    }
                    "help" => print_help(),
                    _ => {
                        handle_discussion(manager, &mut session, &mut learning, current, &user_input, scene_text, &model_config).await?;
                        if session.findings[current].status == FindingStatus::Withdrawn {
                            current += 1;
                            manager.update_current_index(session.session_id, current)?;
                            break;
                        }
                    }
                }
            }
        }

        if lc_state::all_findings_considered(&session.findings) {
            manager.complete_session(session.session_id)?;
            break;
        }

        match lc_state::first_unresolved_index(&session.findings) {
            None => break,
            Some(unresolved) => {
                println!("\n[There are still pending findings. Returning to the first unresolved one.]");
                manager.update_current_index(session.session_id, unresolved)?;
                session.current_index = unresolved;
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("All findings have been considered. Session completed.");
    println!("Type 'export learning' to export LEARNING.md, or 'quit' to exit.");
    println!("{}", "=".repeat(60));

    loop {
        let Some(input) = prompter.read("\n> ") else { break };
        match input.to_ascii_lowercase().as_str() {
            "export learning" => {
                let markdown = manager.export_learning_markdown()?;
                let path = std::path::Path::new(&session.scene_paths[0])
                    .parent()
                    .map(|p| p.join("LEARNING.md"))
                    .unwrap_or_else(|| std::path::PathBuf::from("LEARNING.md"));
                std::fs::write(&path, markdown)?;
                println!("\n  ✓ Exported to {}", path.display());
            }
            "quit" | "q" | "exit" | "" => break,
            _ => {}
        }
    }

    Ok(())
}

fn first_scene_project_hint(session: &Session) -> String {
    std::path::Path::new(&session.scene_paths[0]).parent().map(|p| p.display().to_string()).unwrap_or_else(|| ".".to_string())
}

async fn handle_discussion(
    manager: &SessionManager,
    session: &mut Session,
    learning: &mut Learning,
    current: usize,
    user_input: &str,
    scene_text: &str,
    model_config: &ModelConfig,
) -> crate::error::Result<()> {
    println!("\n[Discussing with critic...]");
    print!("\nCritic: ");
    std::io::stdout().flush().ok();

    let finding_number = session.findings[current].number;
    let response = manager
        .discuss_finding(session.session_id, session, learning, finding_number, user_input, scene_text, false, model_config.clone())
        .await?;
    print!("{}", response.assistant_response);
    println!();

    let idx = session.findings.iter().position(|f| f.number == finding_number).unwrap_or(current);
    match session.findings[idx].status {
        FindingStatus::Accepted => println!("\n[Finding accepted. Type 'continue' to proceed.]"),
        FindingStatus::Rejected => println!("\n[Finding dismissed. Type 'continue' to proceed.]"),
        FindingStatus::Revised => {
            println!("\n[Finding revised by critic:]");
            print_finding_revision(&session.findings[idx]);
            println!("\n[Type 'continue' to proceed, or keep discussing.]");
        }
        FindingStatus::Withdrawn => println!("\n[Finding withdrawn by critic. Moving to next.]"),
        FindingStatus::Escalated => {
            println!("\n[Finding escalated by critic:]");
            print_finding_revision(&session.findings[idx]);
            println!("\n[Type 'continue' to proceed, or keep discussing.]");
        }
        FindingStatus::Pending => {}
    }

    Ok(())
}

pub fn print_summary(
    glossary_issues: &[String],
    summary: &serde_json::Map<String, serde_json::Value>,
    conflicts: &[String],
    ambiguities: &[String],
) {
    println!("\n{}", "=".repeat(60));
    println!("GLOSSARY CHECK");
    println!("{}", "=".repeat(60));
    if glossary_issues.is_empty() {
        println!("  All terms match GLOSSARY.md. No issues.");
    } else {
        for issue in glossary_issues {
            println!("  • {issue}");
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("EDITORIAL SUMMARY");
    println!("{}", "=".repeat(60));
    for (label, key) in [("PROSE", "prose"), ("STRUCTURE", "structure"), ("COHERENCE", "coherence")] {
        let counts = summary.get(key).and_then(|v| v.as_object());
        let get = |k: &str| counts.and_then(|c| c.get(k)).and_then(|v| v.as_u64()).unwrap_or(0);
        println!("  {label:<10} {} critical, {} major, {} minor", get("critical"), get("major"), get("minor"));
    }
    println!("\n  Conflicts between lenses: {}", conflicts.len());
    println!("  Ambiguities requiring clarification: {}", ambiguities.len());

    println!("\n{}", "=".repeat(60));
    println!("Ready for discussion. Type 'continue' to begin.");
    println!("Commands: continue | review | skip to structure | skip to coherence");
    println!("          (coherence = logic + clarity + continuity + dialogue)");
    println!("          reject | accept | export learning | quit | help");
    println!("{}", "=".repeat(60));
}

fn print_finding(finding: &Finding, current: usize, total: usize) {
    println!("\n{}", "-".repeat(60));
    let header = format!("FINDING #{} — {} — {}", finding.number, finding.severity.to_string().to_uppercase(), finding.lens.as_str().to_uppercase());
    let progress = format!("[{current} of {total}]");
    let padding = 60usize.saturating_sub(header.len()).saturating_sub(progress.len()).saturating_sub(1);
    if padding > 0 {
        println!("{header}{}{progress}", " ".repeat(padding));
    } else {
        println!("{header}  {progress}");
    }
    println!("{}", "-".repeat(60));

    let mut location = finding.location.clone();
    if let Some(start) = finding.line_start {
        let tag = format!("L{start}");
        if !location.contains(&tag) {
            let line_ref = match finding.line_end {
                Some(end) if end != start => format!("L{start}-L{end}"),
                _ => tag,
            };
            location = format!("{location}  ({line_ref})");
        }
    }
    println!("\nLocation: {location}");

    if finding.stale {
        println!("  ⚠ [STALE — text in this region was edited, finding may be outdated]");
    }
    println!("\nEvidence: {}", finding.evidence);
    println!("\nImpact: {}", finding.impact);

    println!("\nOptions:");
    for (i, option) in finding.options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }

    if finding.flagged_by.len() > 1 {
        let names: Vec<&str> = finding.flagged_by.iter().map(|l| l.as_str()).collect();
        println!("\n[Flagged by multiple lenses: {}]", names.join(", "));
    }

    if finding.ambiguity_type == Some(AmbiguityType::AmbiguousPossiblyIntentional) {
        println!("\n[This may be intentional ambiguity. Please clarify: 'intentional' or 'accidental']");
    }

    println!("\n{}", "-".repeat(60));
}

fn print_finding_revision(finding: &Finding) {
    let Some(old) = finding.revision_history.last() else { return };
    if old.severity != finding.severity {
        println!("  Severity: {} → {}", old.severity, finding.severity);
    }
    if old.evidence != finding.evidence {
        println!("  Evidence: {}", finding.evidence);
    }
    if old.impact != finding.impact {
        println!("  Impact: {}", finding.impact);
    }
    if old.options != finding.options {
        println!("  Options:");
        for (i, opt) in finding.options.iter().enumerate() {
            println!("    {}. {opt}", i + 1);
        }
    }
}

fn print_scene_change_report(report: &lc_facade::SceneChangeReport) {
    println!("\n  ⟳ Scene file changed.");
    println!("    • {} findings adjusted (line numbers shifted)", report.adjusted);
    if report.stale > 0 {
        println!("    • {} findings marked stale (text was rewritten)", report.stale);
        if !report.re_evaluated.is_empty() {
            println!("    Re-evaluating stale findings against updated scene...");
            for result in &report.re_evaluated {
                match result {
                    lc_core::contracts::ReEvaluateResponse::Updated { finding, .. } => {
                        println!("      ✓ Finding #{}: updated (still valid)", finding.number);
                    }
                    lc_core::contracts::ReEvaluateResponse::Withdrawn { reason, .. } => {
                        println!("      ✓ withdrawn ({reason})");
                    }
                }
            }
        }
    }
    if report.no_lines > 0 {
        println!("    • {} findings have no line numbers (unchanged)", report.no_lines);
    }
}

fn print_help() {
    println!("\nCommands:");
    println!("  continue (c, Enter) - next finding");
    println!("  accept             - accept finding, move on");
    println!("  reject             - reject finding (prompts for reason)");
    println!("  review             - re-check current finding against scene edits");
    println!("  skip to structure  - jump to structure findings");
    println!("  skip to coherence  - jump to coherence findings");
    println!("  intentional        - mark ambiguity as intentional");
    println!("  accidental         - mark ambiguity as accidental");
    println!("  export learning    - export LEARNING.md to project directory");
    println!("  quit (q)           - pause session (auto-saved)");
    println!("  [any other text]   - discuss with critic");
}
