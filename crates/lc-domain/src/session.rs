use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::finding::{DiscussionTurn, Finding, Lens};

/// Owns an ordered sequence of findings plus review progress for one
/// end-to-end pass over a scene (or multi-scene set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub scene_paths: Vec<String>,
    pub scene_hash: String,
    pub model: String,
    pub discussion_model: Option<String>,
    pub current_index: usize,
    pub status: SessionStatus,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub glossary_issues: Vec<String>,
    #[serde(default)]
    pub discussion_history: Vec<DiscussionTurn>,
    pub lens_preferences: LensPreferences,
    pub index_context_hash: Option<String>,
    #[serde(default)]
    pub index_context_stale: bool,
    #[serde(default)]
    pub index_rerun_prompted: bool,
    #[serde(default)]
    pub index_changed_files: Vec<String>,
    /// Last-recorded per-file content for the index set, used to compute
    /// `index_changed_files` as an actual diff rather than re-listing every
    /// tracked file whenever the aggregate hash moves (§4.6).
    #[serde(default)]
    pub index_context_snapshot: crate::prompt::Indexes,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: SessionCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

/// Derived counters, recomputed from `findings` on every auto-save rather
/// than mutated independently (see SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionCounters {
    pub total: u32,
    pub accepted: u32,
    pub rejected: u32,
    pub withdrawn: u32,
}

impl SessionCounters {
    pub fn recompute(findings: &[Finding]) -> Self {
        use crate::finding::FindingStatus;
        let mut c = SessionCounters { total: findings.len() as u32, ..Default::default() };
        for f in findings {
            match f.status {
                FindingStatus::Accepted => c.accepted += 1,
                FindingStatus::Rejected => c.rejected += 1,
                FindingStatus::Withdrawn => c.withdrawn += 1,
                _ => {}
            }
        }
        c
    }
}

/// A preset name plus a per-lens weight map, validated and merged with any
/// user overrides (§4.2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensPreferences {
    pub preset: LensPreset,
    pub weights: HashMap<Lens, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LensPreset {
    Balanced,
    ProseFirst,
    StoryLogic,
    ClarityPass,
    SingleScene,
    MultiScene,
}

impl LensPreset {
    /// `auto` resolves to `single-scene` when scene count <= 1, else
    /// `multi-scene` (§4.2.1).
    pub fn resolve_auto(scene_count: usize) -> Self {
        if scene_count <= 1 {
            LensPreset::SingleScene
        } else {
            LensPreset::MultiScene
        }
    }

    /// Built-in weight table for this preset.
    pub fn weights(self) -> HashMap<Lens, f64> {
        use Lens::*;
        let table: &[(Lens, f64)] = match self {
            LensPreset::Balanced => &[
                (Prose, 1.0), (Structure, 1.0), (Logic, 1.0),
                (Clarity, 1.0), (Continuity, 1.0), (Dialogue, 1.0),
            ],
            LensPreset::ProseFirst => &[
                (Prose, 1.6), (Structure, 1.1), (Logic, 0.9),
                (Clarity, 0.9), (Continuity, 0.8), (Dialogue, 1.1),
            ],
            LensPreset::StoryLogic => &[
                (Prose, 0.8), (Structure, 1.4), (Logic, 1.5),
                (Clarity, 1.0), (Continuity, 1.2), (Dialogue, 1.1),
            ],
            LensPreset::ClarityPass => &[
                (Prose, 0.8), (Structure, 1.0), (Logic, 1.2),
                (Clarity, 1.6), (Continuity, 1.1), (Dialogue, 1.3),
            ],
            LensPreset::SingleScene => &[
                (Prose, 1.5), (Structure, 0.8), (Logic, 1.3),
                (Clarity, 1.3), (Continuity, 0.7), (Dialogue, 1.4),
            ],
            LensPreset::MultiScene => &[
                (Prose, 0.8), (Structure, 1.5), (Logic, 1.3),
                (Clarity, 1.2), (Continuity, 1.5), (Dialogue, 0.7),
            ],
        };
        table.iter().copied().collect()
    }
}

impl LensPreferences {
    pub fn from_preset(preset: LensPreset) -> Self {
        Self { preset, weights: preset.weights() }
    }

    /// Validates and merges user weight overrides onto the preset baseline.
    /// Out-of-range weights (outside `[0.0, 3.0]`) are clamped.
    pub fn with_overrides(mut self, overrides: &HashMap<Lens, f64>) -> Self {
        for (lens, weight) in overrides {
            self.weights.insert(*lens, weight.clamp(0.0, 3.0));
        }
        self
    }

    pub fn weight(&self, lens: Lens) -> f64 {
        self.weights.get(&lens).copied().unwrap_or(1.0)
    }
}
