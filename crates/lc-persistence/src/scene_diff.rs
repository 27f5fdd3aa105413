//! Scene-change detection (§4.7): line-diff based remapping of finding line
//! ranges after a scene file is edited mid-session.
//!
//! Grounded on `original_source/lit_platform/runtime/utils.py`'s
//! `compute_line_mapping`/`adjust_finding_lines`, replicating
//! `difflib.SequenceMatcher`'s opcode reduction with `similar::TextDiff`.

use std::collections::{HashMap, HashSet};

use similar::TextDiff;

use lc_domain::finding::Finding;

/// The three sets `compute_line_mapping` produces, all 1-based.
#[derive(Debug, Clone, Default)]
pub struct LineMapping {
    /// Old line number -> new line number, for lines that survived unchanged.
    pub mapping: HashMap<u32, u32>,
    /// Old line numbers that were deleted or replaced.
    pub deleted: HashSet<u32>,
    /// New line numbers that are entirely new (informational only).
    pub inserted: HashSet<u32>,
}

/// Computes how line numbers shifted between two versions of scene text.
pub fn compute_line_mapping(old_text: &str, new_text: &str) -> LineMapping {
    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    let diff = TextDiff::from_slices(&old_lines, &new_lines);

    let mut mapping = HashMap::new();
    let mut deleted = HashSet::new();
    let mut inserted = HashSet::new();

    for op in diff.ops() {
        let old_range = op.old_range();
        let new_range = op.new_range();
        let tag = op.tag();
        match tag {
            similar::DiffTag::Equal => {
                for offset in 0..old_range.len() {
                    let old_line = (old_range.start + offset + 1) as u32;
                    let new_line = (new_range.start + offset + 1) as u32;
                    mapping.insert(old_line, new_line);
                }
            }
            similar::DiffTag::Delete => {
                for i in old_range.clone() {
                    deleted.insert((i + 1) as u32);
                }
            }
            similar::DiffTag::Replace => {
                for i in old_range.clone() {
                    deleted.insert((i + 1) as u32);
                }
                for j in new_range.clone() {
                    inserted.insert((j + 1) as u32);
                }
            }
            similar::DiffTag::Insert => {
                for j in new_range.clone() {
                    inserted.insert((j + 1) as u32);
                }
            }
        }
    }

    LineMapping { mapping, deleted, inserted }
}

/// The per-finding result of [`adjust_finding_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustOutcome {
    Adjusted,
    Stale,
    NoLines,
}

/// Adjusts a single finding's line range in place using a precomputed
/// [`LineMapping`], per §4.7 step 3.
pub fn adjust_finding_lines(finding: &mut Finding, mapping: &LineMapping) -> AdjustOutcome {
    let Some(start) = finding.line_start else {
        return AdjustOutcome::NoLines;
    };
    let end = finding.line_end.unwrap_or(start);

    if (start..=end).any(|line| mapping.deleted.contains(&line)) {
        finding.stale = true;
        return AdjustOutcome::Stale;
    }

    let new_start = mapping.mapping.get(&start).copied();
    let new_end = mapping.mapping.get(&end).copied();

    match (new_start, new_end) {
        (Some(ns), Some(ne)) => {
            finding.line_start = Some(ns);
            finding.line_end = if finding.line_end.is_some() { Some(ne) } else { None };
            finding.normalize_line_range();
            AdjustOutcome::Adjusted
        }
        _ => {
            finding.stale = true;
            AdjustOutcome::Stale
        }
    }
}

/// Summary of a full scene-change pass over a finding list (§4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneChangeSummary {
    pub total: u32,
    pub adjusted: u32,
    pub stale: u32,
    pub no_lines: u32,
}

/// Applies a scene change to every finding from `start_index` onward,
/// remapping or staling each in place. Mirrors
/// `original_source/lit_platform/runtime/utils.py`'s `apply_scene_change`.
pub fn apply_scene_change(
    findings: &mut [Finding],
    old_text: &str,
    new_text: &str,
    start_index: usize,
) -> SceneChangeSummary {
    let mapping = compute_line_mapping(old_text, new_text);
    let mut summary = SceneChangeSummary::default();

    for finding in findings.iter_mut().skip(start_index) {
        summary.total += 1;
        match adjust_finding_lines(finding, &mapping) {
            AdjustOutcome::Adjusted => summary.adjusted += 1,
            AdjustOutcome::Stale => summary.stale += 1,
            AdjustOutcome::NoLines => summary.no_lines += 1,
        }
    }

    summary
}

/// SHA-256 digest of scene text truncated to 16 hex chars, used as
/// `session.scene_hash` for the stale-session validation contract (§4.6).
pub fn scene_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::finding::{AmbiguityType, Finding, FindingStatus, Lens, Severity};

    fn finding_with_lines(line_start: u32, line_end: u32) -> Finding {
        Finding {
            number: 1,
            severity: Severity::Major,
            lens: Lens::Continuity,
            location: format!("L{line_start}-L{line_end}"),
            line_start: Some(line_start),
            line_end: Some(line_end),
            scene_path: None,
            evidence: "the lantern is lit".to_string(),
            impact: "breaks continuity".to_string(),
            options: Vec::new(),
            flagged_by: vec![Lens::Continuity],
            ambiguity_type: None::<AmbiguityType>,
            stale: false,
            status: FindingStatus::Pending,
            author_response: String::new(),
            discussion_turns: Vec::new(),
            revision_history: Vec::new(),
            outcome_reason: String::new(),
        }
    }

    #[test]
    fn unchanged_lines_map_to_same_position() {
        let old = "one\ntwo\nthree\n";
        let new = "one\ntwo\nthree\n";
        let mapping = compute_line_mapping(old, new);
        assert_eq!(mapping.mapping.get(&1), Some(&1));
        assert_eq!(mapping.mapping.get(&2), Some(&2));
        assert!(mapping.deleted.is_empty());
    }

    #[test]
    fn inserted_line_shifts_subsequent_mapping() {
        let old = "one\ntwo\nthree\n";
        let new = "one\nINSERTED\ntwo\nthree\n";
        let mapping = compute_line_mapping(old, new);
        assert_eq!(mapping.mapping.get(&2), Some(&3));
        assert_eq!(mapping.mapping.get(&3), Some(&4));
        assert!(mapping.inserted.contains(&2));
    }

    #[test]
    fn finding_overlapping_deleted_line_goes_stale() {
        let old = "one\ntwo\nthree\n";
        let new = "one\nthree\n";
        let mapping = compute_line_mapping(old, new);
        let mut f = finding_with_lines(2, 2);
        let outcome = adjust_finding_lines(&mut f, &mapping);
        assert_eq!(outcome, AdjustOutcome::Stale);
        assert!(f.stale);
    }

    #[test]
    fn finding_past_new_end_of_file_goes_stale() {
        let old = "one\ntwo\nthree\n";
        let new = "one\n";
        let mapping = compute_line_mapping(old, new);
        let mut f = finding_with_lines(3, 3);
        let outcome = adjust_finding_lines(&mut f, &mapping);
        assert_eq!(outcome, AdjustOutcome::Stale);
    }

    #[test]
    fn finding_without_line_numbers_reports_no_lines() {
        let mapping = compute_line_mapping("a\n", "a\nb\n");
        let mut f = finding_with_lines(1, 1);
        f.line_start = None;
        f.line_end = None;
        assert_eq!(adjust_finding_lines(&mut f, &mapping), AdjustOutcome::NoLines);
    }

    #[test]
    fn apply_scene_change_tallies_summary_by_outcome() {
        let old = "a\nb\nc\nd\n";
        let new = "a\nX\nc\nd\n";
        let mut findings = vec![finding_with_lines(1, 1), finding_with_lines(2, 2), finding_with_lines(4, 4)];
        let summary = apply_scene_change(&mut findings, old, new, 0);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.adjusted, 2);
        assert_eq!(summary.stale, 1);
    }
}
