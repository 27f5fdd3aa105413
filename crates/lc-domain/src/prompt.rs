//! The `PromptBuilder` capability named in §1's Non-goals: prompt-template
//! authoring is explicitly out of scope for this system, so every prompt
//! string is produced behind this trait rather than inlined at the call
//! site. The analysis pipeline, discussion engine, and re-evaluation path
//! depend only on this interface.

use std::collections::BTreeMap;

use crate::finding::{Finding, Lens, LensChunk};

/// Project-wide context indexes keyed by canonical name (`CANON`, `CAST`,
/// `GLOSSARY`, `STYLE`, `THREADS`, `TIMELINE`). Missing keys mean the
/// author has not populated that index yet.
pub type Indexes = BTreeMap<String, String>;

pub const INDEX_FILES: [&str; 6] = ["CANON", "CAST", "GLOSSARY", "STYLE", "THREADS", "TIMELINE"];

pub trait PromptBuilder: Send + Sync {
    /// The prompt for one lens's plain-text pass over the line-numbered
    /// scene.
    fn lens_prompt(&self, lens: Lens, numbered_scene: &str, indexes: &Indexes) -> String;

    /// The prompt for one coordinator chunk, given the raw text each
    /// successful lens in that chunk produced.
    fn coordinator_chunk_prompt(&self, chunk: LensChunk, lens_outputs: &[(Lens, String)], numbered_scene: &str) -> String;

    /// The prompt for the single-call fallback coordinator, covering every
    /// successful lens at once.
    fn coordinator_prompt(&self, lens_outputs: &[(Lens, String)], numbered_scene: &str) -> String;

    /// The system prompt for one discussion turn: the finding under
    /// discussion, the full scene, and a summary of prior findings'
    /// outcomes for cross-finding continuity.
    fn discussion_system_prompt(&self, finding: &Finding, numbered_scene: &str, prior_outcomes_summary: &str) -> String;

    /// The prompt asking the model to re-evaluate one stale finding
    /// against the edited scene text.
    fn re_evaluation_prompt(&self, finding: &Finding, numbered_scene: &str) -> String;
}

/// A minimal, deterministic [`PromptBuilder`]. Adequate for wiring the
/// pipeline end to end and for tests; a richer author-facing prompt pack is
/// swapped in at the platform boundary without this crate changing.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPromptBuilder;

impl PromptBuilder for BasicPromptBuilder {
    fn lens_prompt(&self, lens: Lens, numbered_scene: &str, indexes: &Indexes) -> String {
        let mut out = format!(
            "You are the {lens} lens of an editorial review engine. Read the scene below and \
             report every issue in its territory as plain prose, one issue per paragraph, \
             citing line numbers from the `L001:`-style prefixes.\n\n"
        );
        for name in INDEX_FILES {
            if let Some(body) = indexes.get(name) {
                out.push_str(&format!("## {name}\n{body}\n\n"));
            }
        }
        out.push_str("## SCENE\n");
        out.push_str(numbered_scene);
        out
    }

    fn coordinator_chunk_prompt(&self, chunk: LensChunk, lens_outputs: &[(Lens, String)], numbered_scene: &str) -> String {
        let chunk_name = match chunk {
            LensChunk::Prose => "prose",
            LensChunk::Structure => "structure",
            LensChunk::Coherence => "coherence",
        };
        let mut out = format!(
            "Merge the following {chunk_name} lens outputs into a single deduplicated, \
             prioritised finding list using the report_findings tool.\n\n"
        );
        for (lens, text) in lens_outputs {
            out.push_str(&format!("### {lens} lens output\n{text}\n\n"));
        }
        out.push_str("## SCENE\n");
        out.push_str(numbered_scene);
        out
    }

    fn coordinator_prompt(&self, lens_outputs: &[(Lens, String)], numbered_scene: &str) -> String {
        let mut out = String::from(
            "Merge all of the following lens outputs into a single deduplicated, prioritised \
             finding list using the report_findings tool.\n\n",
        );
        for (lens, text) in lens_outputs {
            out.push_str(&format!("### {lens} lens output\n{text}\n\n"));
        }
        out.push_str("## SCENE\n");
        out.push_str(numbered_scene);
        out
    }

    fn discussion_system_prompt(&self, finding: &Finding, numbered_scene: &str, prior_outcomes_summary: &str) -> String {
        let mut out = format!(
            "You are discussing finding #{number} ({severity}, {lens} lens) at {location} \
             (lines {line_start}-{line_end}) with the author.\nEvidence: {evidence}\nImpact: {impact}\n\n",
            number = finding.number,
            severity = finding.severity,
            lens = finding.lens,
            location = finding.location,
            line_start = finding.line_start.unwrap_or(0),
            line_end = finding.line_end.unwrap_or(0),
            evidence = finding.evidence,
            impact = finding.impact,
        );
        if !prior_outcomes_summary.is_empty() {
            out.push_str("## Prior findings this session\n");
            out.push_str(prior_outcomes_summary);
            out.push_str("\n\n");
        }
        out.push_str("## SCENE\n");
        out.push_str(numbered_scene);
        out
    }

    fn re_evaluation_prompt(&self, finding: &Finding, numbered_scene: &str) -> String {
        format!(
            "Finding #{number} ({severity}, {lens}) at {location} flagged: {evidence}\n\
             Re-check it against the edited scene below. Reply with a single JSON object, either \
             {{\"status\": \"updated\", \"line_start\": int, \"line_end\": int, \"location\": str, \
             \"evidence\": str, \"severity\": str}} or {{\"status\": \"withdrawn\", \"reason\": str}}.\n\n\
             ## SCENE\n{numbered_scene}",
            number = finding.number,
            severity = finding.severity,
            lens = finding.lens,
            location = finding.location,
            evidence = finding.evidence,
        )
    }
}
