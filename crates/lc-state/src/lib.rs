//! Pure session state machine (SPEC_FULL §4.5).
//!
//! Everything here operates on in-memory [`lc_domain::session::Session`] and
//! [`lc_domain::finding::Finding`] values only — no I/O. The persistence
//! layer calls into this crate, then writes the resulting state; the facade
//! never mutates a finding's `status` directly.

mod navigation;
mod revision;
mod transitions;

pub use navigation::{
    all_findings_considered, first_unresolved_index, next_available_index, next_index_for_lens,
    prior_outcomes_summary, recompute_session_status, LensNavigationTarget,
};
pub use revision::{apply_finding_revision, describe_revision_changes, RevisionFields};
pub use transitions::{
    apply_acceptance, apply_discussion_outcome, apply_re_evaluation_result, apply_rejection,
    record_ambiguity_answer, record_discussion_acceptance, record_discussion_rejection,
    ReEvaluationOutcome, ReEvaluationUpdate,
};

#[cfg(test)]
mod tests;
