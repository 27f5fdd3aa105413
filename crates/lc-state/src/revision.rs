use lc_domain::finding::{Finding, RevisionSnapshot, Severity};

/// Partial revision payload, mirroring the `[REVISION] {json} [/REVISION]`
/// block the discussion engine parses (§4.4). Only fields present in the
/// original JSON are `Some`; [`apply_finding_revision`] overwrites exactly
/// those fields and leaves the rest untouched.
#[derive(Debug, Clone, Default)]
pub struct RevisionFields {
    pub severity: Option<Severity>,
    pub evidence: Option<String>,
    pub impact: Option<String>,
    pub options: Option<Vec<String>>,
}

/// Applies a revision to `finding`, pushing the pre-revision snapshot onto
/// `revision_history` first (§4.5, §8 invariant 3). Returns that snapshot.
pub fn apply_finding_revision(finding: &mut Finding, revision: &RevisionFields) -> RevisionSnapshot {
    let snapshot = RevisionSnapshot::from(&*finding);
    finding.revision_history.push(snapshot.clone());

    if let Some(severity) = revision.severity {
        finding.severity = severity;
    }
    if let Some(evidence) = &revision.evidence {
        finding.evidence = evidence.clone();
    }
    if let Some(impact) = &revision.impact {
        finding.impact = impact.clone();
    }
    if let Some(options) = &revision.options {
        finding.options = options.clone();
    }

    snapshot
}

/// Human-readable summary of what a revision changed, used to compose the
/// canonical `outcome_reason` (e.g. `"Revised: severity major → minor"`).
pub fn describe_revision_changes(old: &RevisionSnapshot, revision: &RevisionFields) -> String {
    let mut changes = Vec::new();
    if let Some(severity) = revision.severity {
        if severity != old.severity {
            changes.push(format!("severity {} → {}", old.severity, severity));
        }
    }
    if revision.evidence.is_some() {
        changes.push("evidence refined".to_string());
    }
    if revision.impact.is_some() {
        changes.push("impact updated".to_string());
    }
    if revision.options.is_some() {
        changes.push("options updated".to_string());
    }

    if changes.is_empty() {
        "minor refinements".to_string()
    } else {
        changes.join(", ")
    }
}
