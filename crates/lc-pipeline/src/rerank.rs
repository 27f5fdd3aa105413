//! Lens-preference re-ranking (SPEC_FULL §4.2.1).
//!
//! Grounded on `lens_preferences.py::rerank_coordinated_findings`. Stable
//! sort by descending score, ties keep insertion order (Rust's
//! `sort_by`/`sort_by_key` are stable, so sorting once on `-score` alone is
//! enough — no explicit index tie-break needed).

use lc_domain::finding::Finding;
use lc_domain::session::LensPreferences;

fn score(finding: &Finding, preferences: &LensPreferences) -> f64 {
    let weight = finding
        .flagged_by
        .iter()
        .map(|lens| preferences.weight(*lens))
        .fold(f64::MIN, f64::max);
    let weight = if weight == f64::MIN { preferences.weight(finding.lens) } else { weight };
    finding.severity.base_score() * weight
}

/// Sorts `findings` by descending `base(severity) * max(weight(lens) for
/// lens in flagged_by)`, then renumbers sequentially from 1.
pub fn rerank(mut findings: Vec<Finding>, preferences: &LensPreferences) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        score(b, preferences)
            .partial_cmp(&score(a, preferences))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, finding) in findings.iter_mut().enumerate() {
        finding.number = (i + 1) as u32;
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::finding::{FindingStatus, Lens, Severity};
    use lc_domain::session::LensPreset;

    fn finding(number: u32, lens: Lens, severity: Severity) -> Finding {
        Finding {
            number,
            severity,
            lens,
            location: "x".into(),
            line_start: None,
            line_end: None,
            scene_path: None,
            evidence: "e".into(),
            impact: "i".into(),
            options: vec![],
            flagged_by: vec![lens],
            ambiguity_type: None,
            stale: false,
            status: FindingStatus::Pending,
            author_response: String::new(),
            discussion_turns: Vec::new(),
            revision_history: Vec::new(),
            outcome_reason: String::new(),
        }
    }

    #[test]
    fn higher_severity_sorts_first_under_balanced_weights() {
        let prefs = LensPreferences::from_preset(LensPreset::Balanced);
        let findings = vec![finding(1, Lens::Prose, Severity::Minor), finding(2, Lens::Logic, Severity::Critical)];
        let ranked = rerank(findings, &prefs);
        assert_eq!(ranked[0].lens, Lens::Logic);
        assert_eq!(ranked[0].number, 1);
        assert_eq!(ranked[1].number, 2);
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let prefs = LensPreferences::from_preset(LensPreset::Balanced);
        let findings = vec![finding(1, Lens::Prose, Severity::Major), finding(2, Lens::Logic, Severity::Major)];
        let ranked = rerank(findings, &prefs);
        assert_eq!(ranked[0].lens, Lens::Prose);
        assert_eq!(ranked[1].lens, Lens::Logic);
    }

    #[test]
    fn preset_weight_can_reorder_equal_severity_findings() {
        let prefs = LensPreferences::from_preset(LensPreset::ProseFirst);
        let findings = vec![finding(1, Lens::Continuity, Severity::Major), finding(2, Lens::Prose, Severity::Major)];
        let ranked = rerank(findings, &prefs);
        assert_eq!(ranked[0].lens, Lens::Prose);
    }
}
