use serde::{Deserialize, Serialize};

/// One editorial observation produced by the analysis pipeline and then
/// carried through the interactive review loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique within a session, 1-based, sequential after dedup+renumber.
    /// `0` only before the coordinator has assigned a real number.
    pub number: u32,
    pub severity: Severity,
    pub lens: Lens,
    pub location: String,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    /// Owning scene when multi-scene; `None` for single-scene sessions.
    pub scene_path: Option<String>,
    pub evidence: String,
    pub impact: String,
    pub options: Vec<String>,
    /// Lens names that produced this finding, after cross-lens merge.
    pub flagged_by: Vec<Lens>,
    pub ambiguity_type: Option<AmbiguityType>,
    pub stale: bool,
    pub status: FindingStatus,
    #[serde(default)]
    pub author_response: String,
    #[serde(default)]
    pub discussion_turns: Vec<DiscussionTurn>,
    #[serde(default)]
    pub revision_history: Vec<RevisionSnapshot>,
    #[serde(default)]
    pub outcome_reason: String,
}

impl Finding {
    /// Normalizes the line range so `line_start <= line_end` whenever both
    /// are present, per the spec's validator rule (§4.3).
    pub fn normalize_line_range(&mut self) {
        if let (Some(start), Some(end)) = (self.line_start, self.line_end) {
            if start > end {
                std::mem::swap(&mut self.line_start, &mut self.line_end);
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Coerces an arbitrary (possibly mixed-case, padded) string into a
    /// known severity, falling back to `major` per §4.3.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "minor" => Severity::Minor,
            _ => Severity::Major,
        }
    }

    /// Base score used by the lens-preference re-ranker (§4.2.1).
    pub fn base_score(self) -> f64 {
        match self {
            Severity::Critical => 100.0,
            Severity::Major => 30.0,
            Severity::Minor => 10.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lens {
    Prose,
    Structure,
    Logic,
    Clarity,
    Continuity,
    Dialogue,
}

impl Lens {
    pub const ALL: [Lens; 6] = [
        Lens::Prose,
        Lens::Structure,
        Lens::Logic,
        Lens::Clarity,
        Lens::Continuity,
        Lens::Dialogue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Lens::Prose => "prose",
            Lens::Structure => "structure",
            Lens::Logic => "logic",
            Lens::Clarity => "clarity",
            Lens::Continuity => "continuity",
            Lens::Dialogue => "dialogue",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prose" => Some(Lens::Prose),
            "structure" => Some(Lens::Structure),
            "logic" => Some(Lens::Logic),
            "clarity" => Some(Lens::Clarity),
            "continuity" => Some(Lens::Continuity),
            "dialogue" => Some(Lens::Dialogue),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three coordinator chunks of §4.2 step 3. Dialogue joins `Prose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensChunk {
    Prose,
    Structure,
    Coherence,
}

impl LensChunk {
    /// Fixed processing order: prose → structure → coherence (§5).
    pub const ORDER: [LensChunk; 3] = [LensChunk::Prose, LensChunk::Structure, LensChunk::Coherence];

    pub fn of(lens: Lens) -> Self {
        match lens {
            Lens::Prose | Lens::Dialogue => LensChunk::Prose,
            Lens::Structure => LensChunk::Structure,
            Lens::Logic | Lens::Clarity | Lens::Continuity => LensChunk::Coherence,
        }
    }

    pub fn members(self) -> Vec<Lens> {
        Lens::ALL.into_iter().filter(|l| LensChunk::of(*l) == self).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityType {
    Unclear,
    AmbiguousPossiblyIntentional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Pending,
    Accepted,
    Rejected,
    Revised,
    Withdrawn,
    Escalated,
}

impl FindingStatus {
    pub const TERMINAL: [FindingStatus; 3] = [
        FindingStatus::Accepted,
        FindingStatus::Rejected,
        FindingStatus::Withdrawn,
    ];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionTurn {
    pub role: DiscussionRole,
    pub content: String,
}

/// Snapshot of the mutable review fields pushed onto `revision_history`
/// whenever a finding is revised or escalated (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionSnapshot {
    pub severity: Severity,
    pub evidence: String,
    pub impact: String,
    pub options: Vec<String>,
}

impl From<&Finding> for RevisionSnapshot {
    fn from(f: &Finding) -> Self {
        Self {
            severity: f.severity,
            evidence: f.evidence.clone(),
            impact: f.impact.clone(),
            options: f.options.clone(),
        }
    }
}
