use serde::{Deserialize, Serialize};

/// The status tag a discussion turn terminates with (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    /// `[CONTINUE]`, or no recognised tag at all (§4.4's parsing default).
    Continue,
    /// `[ACCEPTED]`.
    Accepted,
    /// `[REJECTED]`.
    Rejected,
    /// `[CONCEDED]` — the critic concedes; mapped to terminal `withdrawn`.
    Conceded,
    /// `[REVISED]`, expects a `[REVISION]` block.
    Revised,
    /// `[WITHDRAWN]`.
    Withdrawn,
    /// `[ESCALATED]`, expects a `[REVISION]` block.
    Escalated,
}

impl DiscussionStatus {
    pub fn is_terminal_or_revising(self) -> bool {
        !matches!(self, DiscussionStatus::Continue)
    }
}

/// `[AMBIGUITY:INTENTIONAL]` / `[AMBIGUITY:ACCIDENTAL]` classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityClassification {
    Intentional,
    Accidental,
}
