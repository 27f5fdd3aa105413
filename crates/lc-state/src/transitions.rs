use lc_domain::discussion::DiscussionStatus;
use lc_domain::finding::{Finding, FindingStatus};
use lc_domain::learning::{AmbiguityAnswer, Learning, SessionAcceptance, SessionRejection};

use crate::revision::{apply_finding_revision, describe_revision_changes, RevisionFields};

fn excerpt(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// `ApplyAcceptance` (§4.5): marks a finding accepted and records the
/// acceptance learning signal.
pub fn apply_acceptance(finding: &mut Finding, learning: &mut Learning) {
    finding.status = FindingStatus::Accepted;
    finding.outcome_reason = "Accepted by author".to_string();
    learning.session_acceptances.push(SessionAcceptance {
        lens: finding.lens.as_str().to_string(),
        pattern: excerpt(&finding.evidence, 100),
    });
}

/// `ApplyRejection` (§4.5): marks a finding rejected and records the
/// rejection learning signal with the author's reason.
pub fn apply_rejection(finding: &mut Finding, learning: &mut Learning, reason: &str) {
    finding.status = FindingStatus::Rejected;
    finding.author_response = reason.to_string();
    finding.outcome_reason = format!("Rejected by author: {}", excerpt(reason, 150));
    learning.session_rejections.push(SessionRejection {
        lens: finding.lens.as_str().to_string(),
        pattern: excerpt(&finding.evidence, 100),
        reason: reason.to_string(),
        preference_rule: None,
    });
}

/// `ApplyDiscussionOutcome` (§4.5): applies the parsed tag, the optional
/// revision payload, and sets the canonical `outcome_reason`. Does not
/// record learning signals directly — callers combine this with
/// [`record_discussion_rejection`] / [`record_discussion_acceptance`] per
/// the discussion engine's side-effect rules (§4.4).
pub fn apply_discussion_outcome(
    finding: &mut Finding,
    status: DiscussionStatus,
    response_text: &str,
    user_message: &str,
    revision: Option<&RevisionFields>,
) {
    match status {
        DiscussionStatus::Accepted => {
            finding.status = FindingStatus::Accepted;
            finding.outcome_reason = "Accepted by author".to_string();
        }
        DiscussionStatus::Conceded => {
            finding.status = FindingStatus::Withdrawn;
            finding.outcome_reason = format!("Conceded by critic: {}", excerpt(response_text, 150));
        }
        DiscussionStatus::Rejected => {
            finding.status = FindingStatus::Rejected;
            finding.outcome_reason = format!("Rejected by author: {}", excerpt(user_message, 150));
        }
        DiscussionStatus::Withdrawn => {
            finding.status = FindingStatus::Withdrawn;
            finding.outcome_reason = format!("Withdrawn by critic: {}", excerpt(response_text, 150));
        }
        DiscussionStatus::Revised | DiscussionStatus::Escalated => {
            finding.status = if status == DiscussionStatus::Revised {
                FindingStatus::Revised
            } else {
                FindingStatus::Escalated
            };
            if let Some(revision) = revision {
                let old = apply_finding_revision(finding, revision);
                let change_desc = describe_revision_changes(&old, revision);
                let action = if status == DiscussionStatus::Revised {
                    "Revised"
                } else {
                    "Escalated"
                };
                finding.outcome_reason = format!("{action}: {change_desc}");
            }
        }
        DiscussionStatus::Continue => {}
    }
}

/// Records a rejection/concession learning signal raised mid-discussion
/// (§4.4's side effects), optionally carrying an explicit `[PREFERENCE: …]`
/// rule extracted from the same turn.
pub fn record_discussion_rejection(
    finding: &Finding,
    learning: &mut Learning,
    reason: &str,
    preference_rule: Option<String>,
) {
    learning.session_rejections.push(SessionRejection {
        lens: finding.lens.as_str().to_string(),
        pattern: excerpt(&finding.evidence, 100),
        reason: excerpt(reason, 200),
        preference_rule,
    });
}

/// Records an acceptance learning signal raised mid-discussion.
pub fn record_discussion_acceptance(finding: &Finding, learning: &mut Learning) {
    learning.session_acceptances.push(SessionAcceptance {
        lens: finding.lens.as_str().to_string(),
        pattern: excerpt(&finding.evidence, 100),
    });
}

/// Records an author ambiguity classification (`[AMBIGUITY:…]` tag, §4.4).
pub fn record_ambiguity_answer(finding: &Finding, learning: &mut Learning, intentional: bool) {
    learning.session_ambiguity_answers.push(AmbiguityAnswer {
        location: finding.location.clone(),
        description: excerpt(&finding.evidence, 100),
        intentional,
    });
}

/// Result of re-evaluating a stale finding against edited scene text (§4.7).
#[derive(Debug, Clone)]
pub enum ReEvaluationOutcome {
    /// Line range/location/evidence/severity updated; `stale` cleared.
    Updated,
    /// The edit resolved the issue; finding withdrawn.
    Withdrawn { reason: String },
}

/// Fields the re-evaluation engine may return for the `updated` case.
#[derive(Debug, Clone, Default)]
pub struct ReEvaluationUpdate {
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    pub location: Option<String>,
    pub evidence: Option<String>,
    pub severity: Option<lc_domain::finding::Severity>,
}

/// `ApplyReEvaluationResult` (§4.5): applies a re-evaluation outcome to a
/// stale finding, clearing `stale` in either branch.
pub fn apply_re_evaluation_result(
    finding: &mut Finding,
    outcome: &ReEvaluationOutcome,
    update: Option<&ReEvaluationUpdate>,
) {
    match outcome {
        ReEvaluationOutcome::Updated => {
            if let Some(u) = update {
                if let Some(ls) = u.line_start {
                    finding.line_start = Some(ls);
                }
                if let Some(le) = u.line_end {
                    finding.line_end = Some(le);
                }
                if let Some(loc) = &u.location {
                    finding.location = loc.clone();
                }
                if let Some(ev) = &u.evidence {
                    if !ev.is_empty() {
                        finding.evidence = ev.clone();
                    }
                }
                if let Some(sev) = u.severity {
                    finding.severity = sev;
                }
            }
            finding.normalize_line_range();
            finding.stale = false;
        }
        ReEvaluationOutcome::Withdrawn { reason } => {
            finding.status = FindingStatus::Withdrawn;
            finding.stale = false;
            finding.outcome_reason = format!("Withdrawn after re-evaluation: {reason}");
        }
    }
}
