use serde::{Deserialize, Serialize};

/// Per-project persistent memory, capturing author preferences, blind
/// spots, resolutions, and ambiguity classifications across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    pub project_name: String,
    pub review_count: u32,
    pub preferences: Vec<LearningEntry>,
    pub blind_spots: Vec<LearningEntry>,
    pub resolutions: Vec<LearningEntry>,
    pub ambiguity_intentional: Vec<LearningEntry>,
    pub ambiguity_accidental: Vec<LearningEntry>,
    /// Session-scoped working lists, drained into the lists above at
    /// commit points (§4.8) and cleared at the end of the session.
    #[serde(default)]
    pub session_rejections: Vec<SessionRejection>,
    #[serde(default)]
    pub session_acceptances: Vec<SessionAcceptance>,
    #[serde(default)]
    pub session_ambiguity_answers: Vec<AmbiguityAnswer>,
}

impl Learning {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            review_count: 0,
            preferences: Vec::new(),
            blind_spots: Vec::new(),
            resolutions: Vec::new(),
            ambiguity_intentional: Vec::new(),
            ambiguity_accidental: Vec::new(),
            session_rejections: Vec::new(),
            session_acceptances: Vec::new(),
            session_ambiguity_answers: Vec::new(),
        }
    }

    pub fn category(&self, category: LearningCategory) -> &[LearningEntry] {
        match category {
            LearningCategory::Preference => &self.preferences,
            LearningCategory::BlindSpot => &self.blind_spots,
            LearningCategory::Resolution => &self.resolutions,
            LearningCategory::AmbiguityIntentional => &self.ambiguity_intentional,
            LearningCategory::AmbiguityAccidental => &self.ambiguity_accidental,
        }
    }

    pub fn category_mut(&mut self, category: LearningCategory) -> &mut Vec<LearningEntry> {
        match category {
            LearningCategory::Preference => &mut self.preferences,
            LearningCategory::BlindSpot => &mut self.blind_spots,
            LearningCategory::Resolution => &mut self.resolutions,
            LearningCategory::AmbiguityIntentional => &mut self.ambiguity_intentional,
            LearningCategory::AmbiguityAccidental => &mut self.ambiguity_accidental,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningCategory {
    Preference,
    BlindSpot,
    Resolution,
    AmbiguityIntentional,
    AmbiguityAccidental,
}

impl LearningCategory {
    pub const ALL: [LearningCategory; 5] = [
        LearningCategory::Preference,
        LearningCategory::BlindSpot,
        LearningCategory::Resolution,
        LearningCategory::AmbiguityIntentional,
        LearningCategory::AmbiguityAccidental,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LearningCategory::Preference => "preference",
            LearningCategory::BlindSpot => "blind_spot",
            LearningCategory::Resolution => "resolution",
            LearningCategory::AmbiguityIntentional => "ambiguity_intentional",
            LearningCategory::AmbiguityAccidental => "ambiguity_accidental",
        }
    }

    /// Markdown export section heading, in the fixed order §4.8 mandates.
    pub fn heading(self) -> &'static str {
        match self {
            LearningCategory::Preference => "Preferences",
            LearningCategory::BlindSpot => "Blind Spots",
            LearningCategory::Resolution => "Resolutions",
            LearningCategory::AmbiguityIntentional => "Ambiguity Patterns (Intentional)",
            LearningCategory::AmbiguityAccidental => "Ambiguity Patterns (Accidental)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEntry {
    pub id: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAcceptance {
    pub lens: String,
    /// First 100 chars of the accepted finding's evidence.
    pub pattern: String,
}

/// A rejection/concession learning signal, queued for the next
/// `PersistSessionLearning` commit (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRejection {
    pub lens: String,
    /// First 100 chars of the rejected finding's evidence.
    pub pattern: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_rule: Option<String>,
}

/// An author ambiguity classification, queued for the next commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbiguityAnswer {
    pub location: String,
    /// First 100 chars of the finding's evidence.
    pub description: String,
    pub intentional: bool,
}

/// Raw snapshot of `Learning`'s three session-scoped working lists, mirrored
/// onto the `session.learning_session` column on every learning-producing
/// action (§4.6). Lets a resumed session recover signals recorded between a
/// review action and the next drain into long-term `learning_entry` rows,
/// rather than silently losing them to a crash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningSessionSnapshot {
    #[serde(default)]
    pub session_rejections: Vec<SessionRejection>,
    #[serde(default)]
    pub session_acceptances: Vec<SessionAcceptance>,
    #[serde(default)]
    pub session_ambiguity_answers: Vec<AmbiguityAnswer>,
}

impl LearningSessionSnapshot {
    pub fn from_learning(learning: &Learning) -> Self {
        Self {
            session_rejections: learning.session_rejections.clone(),
            session_acceptances: learning.session_acceptances.clone(),
            session_ambiguity_answers: learning.session_ambiguity_answers.clone(),
        }
    }

    /// Merges this snapshot's entries onto `learning`'s working lists,
    /// additively — used when resuming a session whose in-memory working
    /// lists are empty but whose last persisted snapshot may still hold
    /// signals from before the last commit.
    pub fn merge_into(self, learning: &mut Learning) {
        learning.session_rejections.extend(self.session_rejections);
        learning.session_acceptances.extend(self.session_acceptances);
        learning.session_ambiguity_answers.extend(self.session_ambiguity_answers);
    }
}
