//! Cross-chunk finding dedup (SPEC_FULL §4.2 step 6).
//!
//! Grounded on `original_source/lit_platform/runtime/api.py`'s
//! `_dedup_findings_across_groups`: two findings are the same issue when
//! their line ranges overlap by more than half of the shorter range. On a
//! merge, the higher-severity finding's body wins and `flagged_by` is
//! unioned. The primary `lens` field of a merged finding is the
//! alphabetically first member of the unioned `flagged_by` set (DESIGN.md
//! Open Question #1 — deterministic where the source left it
//! insertion-order-dependent).

use lc_domain::finding::{Finding, Lens};

fn overlaps(a: &Finding, b: &Finding) -> bool {
    let (Some(a_start), Some(b_start)) = (a.line_start, b.line_start) else {
        return false;
    };
    let a_end = a.line_end.unwrap_or(a_start);
    let b_end = b.line_end.unwrap_or(b_start);

    let overlap_start = a_start.max(b_start);
    let overlap_end = a_end.min(b_end);
    if overlap_start > overlap_end {
        return false;
    }
    let overlap_len = (overlap_end - overlap_start + 1) as f64;
    let min_len = ((a_end - a_start + 1).min(b_end - b_start + 1)) as f64;
    min_len > 0.0 && overlap_len / min_len > 0.5
}

fn merge_into(existing: &mut Finding, incoming: &Finding) {
    if incoming.severity > existing.severity {
        existing.severity = incoming.severity;
        existing.evidence = incoming.evidence.clone();
        existing.impact = incoming.impact.clone();
        existing.options = incoming.options.clone();
    }

    for lens in &incoming.flagged_by {
        if !existing.flagged_by.contains(lens) {
            existing.flagged_by.push(*lens);
        }
    }
    existing.flagged_by.sort_by_key(|l| l.as_str());

    existing.lens = primary_lens(&existing.flagged_by);
}

fn primary_lens(flagged_by: &[Lens]) -> Lens {
    flagged_by
        .iter()
        .copied()
        .min_by_key(|l| l.as_str())
        .unwrap_or(Lens::Prose)
}

/// Deduplicates `findings` in order, keeping the first occurrence of each
/// cluster and merging subsequent overlapping findings into it.
pub fn dedup_across_chunks(findings: Vec<Finding>) -> Vec<Finding> {
    let mut result: Vec<Finding> = Vec::with_capacity(findings.len());
    for finding in findings {
        if let Some(existing) = result.iter_mut().find(|existing| overlaps(existing, &finding)) {
            merge_into(existing, &finding);
        } else {
            result.push(finding);
        }
    }
    result
}
