use lc_domain::finding::{Finding, Lens};
use lc_domain::session::{Session, SessionStatus};

/// Returns the index of the first non-terminal finding, or `None` when every
/// finding is terminal.
pub fn first_unresolved_index(findings: &[Finding]) -> Option<usize> {
    findings.iter().position(|f| !f.is_terminal())
}

/// `true` when every finding has reached a terminal status (§4.5, §8 invariant 1).
pub fn all_findings_considered(findings: &[Finding]) -> bool {
    findings.iter().all(Finding::is_terminal)
}

/// The lens-group skip target used by [`next_index_for_lens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensNavigationTarget {
    /// Skip past `prose` findings.
    Structure,
    /// Skip past `prose` and `structure` findings.
    Coherence,
}

/// Advances past `current_index`, applying the lens-group skip semantics of
/// §4.5: jumping to `structure` review skips `prose`; jumping to `coherence`
/// review skips `prose` and `structure`.
pub fn next_index_for_lens(
    findings: &[Finding],
    current_index: usize,
    target: LensNavigationTarget,
) -> usize {
    let mut idx = current_index + 1;
    while idx < findings.len() {
        let lens = findings[idx].lens;
        let skip = match target {
            LensNavigationTarget::Structure => lens == Lens::Prose,
            LensNavigationTarget::Coherence => lens == Lens::Prose || lens == Lens::Structure,
        };
        if !skip {
            break;
        }
        idx += 1;
    }
    idx
}

/// Returns the first index at or after `start_index` whose finding is not
/// already withdrawn, or `findings.len()` if none remain.
pub fn next_available_index(findings: &[Finding], start_index: usize) -> usize {
    use lc_domain::finding::FindingStatus;
    let mut idx = start_index;
    while idx < findings.len() && findings[idx].status == FindingStatus::Withdrawn {
        idx += 1;
    }
    idx
}

/// Builds the compact "prior outcomes" summary fed into discussion system
/// prompts for cross-finding continuity (§4.4, §4.5).
pub fn prior_outcomes_summary(findings: &[Finding], current_number: u32) -> String {
    use lc_domain::finding::FindingStatus;

    let mut lines = Vec::new();
    for finding in findings {
        if finding.number == current_number {
            continue;
        }
        if finding.status == FindingStatus::Pending {
            continue;
        }

        let status_desc = format!("{:?}", finding.status).to_uppercase();
        let reason = if !finding.outcome_reason.is_empty() {
            format!(" — {}", finding.outcome_reason)
        } else if !finding.author_response.is_empty() {
            format!(" — author: \"{}\"", truncate(&finding.author_response, 100))
        } else {
            String::new()
        };

        lines.push(format!(
            "- Finding #{} ({}, {}): {}{}",
            finding.number, finding.lens, finding.severity, status_desc, reason
        ));
    }

    lines.join("\n")
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Recomputes `Session.status` from its findings (§4.5's completion
/// invariant): complete iff every finding is terminal, else active. A
/// previously-completed session automatically reopens when a finding
/// reverts to a non-terminal status (§8 invariant 2).
pub fn recompute_session_status(session: &mut Session) {
    if session.status == SessionStatus::Abandoned {
        return;
    }
    if all_findings_considered(&session.findings) {
        if session.status != SessionStatus::Completed {
            session.status = SessionStatus::Completed;
            session.completed_at = Some(chrono::Utc::now());
        }
    } else if session.status == SessionStatus::Completed {
        session.status = SessionStatus::Active;
        session.completed_at = None;
    }
    session.counters = lc_domain::session::SessionCounters::recompute(&session.findings);
}
