//! Session orchestration (SPEC_FULL §4.10): the Platform Facade's single
//! entry point tying filesystem I/O, the `CoreClient` wire boundary, the
//! pure state machine, persistence, and learning together.
//!
//! Grounded on `original_source/lit_platform/facade.py` (request shaping)
//! and `original_source/lit_platform/services/session_service.py` (session
//! lifecycle, scene-change detection, index-context staleness).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use lc_domain::error::{Result, SceneValidationError};
use lc_domain::finding::{Finding, Lens};
use lc_domain::learning::Learning;
use lc_domain::prompt::Indexes;
use lc_domain::session::{LensPreferences, LensPreset, Session};

use lc_core::contracts::{
    AnalyzeRequest, DiscussAction, DiscussRequest, LensPreferencesWire, ModelConfig, ReEvaluateRequest,
    ReEvaluateResponse,
};

use crate::core_client::CoreClient;
use crate::context::condense_discussion_context;
use crate::indexes::{index_content_hash, load_indexes_from_project, load_legacy_learning_markdown, load_scene_text};
use crate::scenes::{concatenate_scenes, map_global_range_to_scene};

/// Report returned by [`SessionManager::start_session`]: the created
/// session plus any glossary issues/ambiguities surfaced by the first
/// analysis pass, which have no home on `Session` itself.
#[derive(Debug, Clone)]
pub struct NewSessionReport {
    pub session: Session,
    pub ambiguities: Vec<String>,
    pub conflicts: Vec<String>,
    /// Per-chunk severity tally (`{"prose": {"critical": 0, ...}, ...}`)
    /// from the coordinator's `summary` object (§4.2). Informational only
    /// — `Session` has no persisted home for it, matching §3's data model.
    pub summary: serde_json::Map<String, serde_json::Value>,
}

impl NewSessionReport {
    /// Glossary issues live on `session.glossary_issues` once persisted;
    /// exposed here too so callers don't need to know that detail.
    pub fn glossary_issues(&self) -> &[String] {
        &self.session.glossary_issues
    }
}

/// Outcome of a scene-change detection pass (§4.7), flattened from the
/// per-finding adjust/stale/no-lines tallies plus any re-evaluation
/// results for findings that went stale.
#[derive(Debug, Clone, Default)]
pub struct SceneChangeReport {
    pub changed: bool,
    pub adjusted: u32,
    pub stale: u32,
    pub no_lines: u32,
    pub re_evaluated: Vec<ReEvaluateResponse>,
}

/// Outcome of [`SessionManager::check_index_context`] (§4.6). There is no
/// "only `LEARNING.md` changed" branch here: unlike the original system,
/// [`index_content_hash`] never hashes `LEARNING.md` in the first place, so
/// a hash change always reflects a genuine index edit.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexContextCheck {
    Unchanged,
    Stale { changed_files: Vec<String>, should_prompt: bool },
}

/// Ties one project's persistence store to a `CoreClient` and drives the
/// full session lifecycle. One instance per open project, matching the
/// "one persistence connection per session" resource rule (§5).
pub struct SessionManager {
    store: lc_persistence::ProjectStore,
    core_client: Arc<dyn CoreClient>,
    project_path: PathBuf,
    project_name: String,
}

impl SessionManager {
    pub fn open(project_path: &Path, core_client: Arc<dyn CoreClient>) -> Result<Self> {
        let store = lc_persistence::ProjectStore::open(project_path)?;
        let project_name = project_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| project_path.to_string_lossy().into_owned());
        Ok(Self { store, core_client, project_path: project_path.to_path_buf(), project_name })
    }

    /// Reads, concatenates (multi-scene), analyzes, and persists a brand
    /// new session. Mirrors `session_service.py::create_session`, but
    /// always re-derives a fresh `Session` via `ProjectStore::get_session`
    /// afterward rather than hand-assembling one in memory, so the
    /// returned value is guaranteed consistent with what was actually
    /// written.
    pub async fn start_session(
        &self,
        scene_paths: Vec<String>,
        model_config: ModelConfig,
        discussion_model: Option<String>,
        preset_name: &str,
        weight_overrides: HashMap<String, f64>,
    ) -> Result<NewSessionReport> {
        let scene_docs: Vec<(String, String)> = scene_paths
            .iter()
            .map(|p| load_scene_text(Path::new(p)).map(|text| (p.clone(), text)))
            .collect::<Result<_>>()?;

        let (concatenated_text, line_map) = concatenate_scenes(&scene_docs);
        let multi_scene = scene_docs.len() > 1;

        let indexes = load_indexes_from_project(&self.project_path);
        let index_hash = index_content_hash(&indexes);

        let lens_preferences = resolve_lens_preferences(preset_name, scene_docs.len(), &weight_overrides)?;

        let req = AnalyzeRequest {
            scene_text: concatenated_text.clone(),
            indexes: indexes.clone(),
            learning_context: None,
            model_config: model_config.clone(),
            lens_preferences: lens_preferences_wire(&lens_preferences, preset_name, &weight_overrides),
        };

        let response = self.core_client.analyze(req).await?;

        let mut findings = response.findings;
        if multi_scene {
            for finding in &mut findings {
                let (scene_path, local_start, local_end) =
                    map_global_range_to_scene(&line_map, finding.line_start, finding.line_end);
                finding.scene_path = scene_path;
                finding.line_start = local_start;
                finding.line_end = local_end;
                finding.normalize_line_range();
            }
        }

        let scene_hash = lc_persistence::scene_diff::scene_hash(&concatenated_text);

        let session_id = self.store.create_session(
            &scene_paths,
            &scene_hash,
            &model_config.model,
            discussion_model.as_deref(),
            &lens_preferences,
        )?;
        self.store.persist_findings(session_id, &findings)?;
        self.store.update_glossary_issues(session_id, &response.glossary_issues)?;
        self.store.update_index_context(session_id, index_hash.as_deref(), false, false, &[], &indexes)?;

        self.seed_learning_if_first_session(&indexes)?;

        let session = self
            .store
            .get_session(session_id)?
            .ok_or_else(|| lc_domain::error::Error::Persistence("session vanished immediately after creation".into()))?;

        Ok(NewSessionReport { session, ambiguities: response.ambiguities, conflicts: response.conflicts, summary: response.summary })
    }

    /// Imports a legacy `LEARNING.md` into the database exactly once, on a
    /// project's first session (§4.6). A project already carrying any
    /// learning data is left untouched.
    fn seed_learning_if_first_session(&self, _indexes: &Indexes) -> Result<()> {
        let existing = self.store.load_learning(&self.project_name)?;
        let is_empty = existing.review_count == 0
            && existing.preferences.is_empty()
            && existing.blind_spots.is_empty()
            && existing.resolutions.is_empty()
            && existing.ambiguity_intentional.is_empty()
            && existing.ambiguity_accidental.is_empty();
        if !is_empty {
            return Ok(());
        }
        let Some(markdown) = load_legacy_learning_markdown(&self.project_path) else {
            return Ok(());
        };
        let seeded = lc_learning::parse_markdown(&self.project_name, &markdown);
        self.store.save_learning(&seeded)?;
        Ok(())
    }

    pub fn resume_session(&self) -> Result<Option<Session>> {
        self.store.load_active_session()
    }

    /// Checks a freshly-loaded session against the scene content `resume`
    /// just read off disk (§4.6, §7's `SceneValidationError`). Mirrors
    /// `original_source/lit_platform/services/session_service.py::validate_session`:
    /// a soft check, not a hard failure — path-set mismatch and hash drift
    /// both return `Some(detail)` for the caller to print as a warning and
    /// proceed, since actual reconciliation happens once the interactive
    /// loop hits `detect_and_apply_scene_changes`. Paths are compared by
    /// canonical form so `./scene.md` and `scene.md` don't spuriously
    /// mismatch.
    pub fn validate_scene_state(
        session: &Session,
        scene_content: &str,
        requested_scene_paths: &[String],
    ) -> Option<SceneValidationError> {
        let canon = |p: &String| -> String {
            Path::new(p)
                .canonicalize()
                .map(|c| c.to_string_lossy().into_owned())
                .unwrap_or_else(|_| p.clone())
        };

        let saved: HashSet<String> = session.scene_paths.iter().map(canon).collect();
        let requested: HashSet<String> = requested_scene_paths.iter().map(canon).collect();

        if saved != requested {
            return Some(SceneValidationError {
                message: "session is for a different scene set".to_string(),
                saved_paths: session.scene_paths.clone(),
                attempted_paths: requested_scene_paths.to_vec(),
            });
        }

        let current_hash = lc_persistence::scene_diff::scene_hash(scene_content);
        if session.scene_hash != current_hash {
            return Some(SceneValidationError {
                message: "scene file has been modified since the session was saved".to_string(),
                saved_paths: session.scene_paths.clone(),
                attempted_paths: requested_scene_paths.to_vec(),
            });
        }

        None
    }

    pub fn get_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.store.get_session(session_id)
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        self.store.list_sessions()
    }

    pub fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        self.store.delete_session(session_id)
    }

    pub fn abandon_session(&self, session_id: Uuid) -> Result<()> {
        self.store.abandon_session(session_id)
    }

    /// Persists the interactive loop's current position, so `resume`
    /// continues from the same finding after a crash (§4.5's navigation
    /// state, §4.6's auto-save contract).
    pub fn update_current_index(&self, session_id: Uuid, index: usize) -> Result<()> {
        self.store.update_current_index(session_id, index)
    }

    /// Marks a session completed and increments the project's review
    /// count exactly once (§3's invariant, §4.8). Only valid once every
    /// finding has reached a terminal status; callers should check
    /// [`lc_state::all_findings_considered`] first.
    pub fn complete_session(&self, session_id: Uuid) -> Result<()> {
        self.store.complete_session(session_id, &self.project_name)
    }

    pub fn load_learning(&self) -> Result<Learning> {
        lc_learning::load(&self.store, &self.project_name)
    }

    /// Loads long-term learning for a specific session, merging in any raw
    /// working-list snapshot persisted before a crash interrupted the next
    /// commit pass (§4.6/§4.8). Prefer this over [`Self::load_learning`]
    /// when resuming an active session.
    pub fn load_learning_for_session(&self, session_id: Uuid) -> Result<Learning> {
        let mut learning = self.load_learning()?;
        self.store.load_learning_session(session_id)?.merge_into(&mut learning);
        Ok(learning)
    }

    /// Persists `learning`'s current working-list snapshot onto the session
    /// row — crash-durability half of `PersistSessionLearning` (§4.6,
    /// §4.8), called before any drain into long-term storage.
    fn persist_learning_session(&self, session_id: Uuid, learning: &Learning) -> Result<()> {
        self.store.persist_learning_session(session_id, learning)
    }

    pub fn export_learning_markdown(&self) -> Result<String> {
        lc_learning::export_markdown(&self.store, &self.project_name)
    }

    /// Deletes all learning data for the project (`lit-critic learning
    /// reset`).
    pub fn reset_learning(&self) -> Result<()> {
        self.store.reset_learning()
    }

    /// Accepts a finding and auto-saves it (§4.5's `ApplyAcceptance`).
    /// Acceptances have no long-term learning mapping, so no commit pass
    /// follows.
    pub fn accept_finding(&self, session_id: Uuid, finding: &mut Finding, learning: &mut Learning) -> Result<()> {
        lc_state::apply_acceptance(finding, learning);
        self.store.persist_finding(session_id, finding)?;
        self.persist_learning_session(session_id, learning)?;
        learning.session_acceptances.clear();
        self.persist_learning_session(session_id, learning)?;
        Ok(())
    }

    /// Rejects a finding, auto-saves it, and commits the resulting
    /// rejection entry into long-term learning (§4.5, §4.8).
    pub fn reject_finding(
        &self,
        session_id: Uuid,
        finding: &mut Finding,
        learning: &mut Learning,
        reason: &str,
    ) -> Result<()> {
        lc_state::apply_rejection(finding, learning, reason);
        self.store.persist_finding(session_id, finding)?;
        self.persist_learning_session(session_id, learning)?;
        self.commit_learning(learning)?;
        self.persist_learning_session(session_id, learning)
    }

    /// One non-streaming discussion turn (§4.4, §4.9's `/v1/discuss`).
    /// Condenses `finding.discussion_turns` into `discussion_context`
    /// before sending, per §4.10; the full history on `finding` is left
    /// untouched and grows by exactly one user/assistant pair regardless
    /// of what the core echoes back.
    ///
    /// The Core Service is stateless and never sees `learning` (§4.9), so
    /// any learning signal the discussion turn produced travels back as
    /// the wire-level `action` payload; this re-derives the same
    /// `lc_discussion::effects` side effects from that payload and commits
    /// them, mirroring what the in-process discussion path applies directly.
    pub async fn discuss_finding(
        &self,
        session_id: Uuid,
        session: &mut Session,
        learning: &mut Learning,
        finding_number: u32,
        author_message: &str,
        scene_text: &str,
        scene_changed: bool,
        model_config: ModelConfig,
    ) -> Result<lc_core::contracts::DiscussResponse> {
        let idx = session
            .findings
            .iter()
            .position(|f| f.number == finding_number)
            .ok_or_else(|| lc_domain::error::Error::Validation(format!("no finding numbered {finding_number}")))?;

        let discussion_context = condense_discussion_context(&session.findings[idx].discussion_turns);
        let prior_outcomes = lc_state::prior_outcomes_summary(&session.findings, finding_number);

        let req = DiscussRequest {
            scene_text: scene_text.to_string(),
            finding: session.findings[idx].clone(),
            discussion_context,
            prior_outcomes_summary: prior_outcomes,
            author_message: author_message.to_string(),
            scene_changed,
            model_config,
        };

        let response = self.core_client.discuss(req).await?;
        session.findings[idx] = response.updated_finding.clone();
        self.store.persist_finding(session_id, &session.findings[idx])?;

        session.discussion_history.push(lc_domain::finding::DiscussionTurn {
            role: lc_domain::finding::DiscussionRole::User,
            content: author_message.to_string(),
        });
        session.discussion_history.push(lc_domain::finding::DiscussionTurn {
            role: lc_domain::finding::DiscussionRole::Assistant,
            content: response.assistant_response.clone(),
        });
        self.store.update_discussion_history(session_id, &session.discussion_history)?;

        let produced_signal =
            apply_discuss_action_to_learning(&session.findings[idx], &response.action, author_message, learning);
        if produced_signal {
            self.persist_learning_session(session_id, learning)?;
            self.commit_learning(learning)?;
            self.persist_learning_session(session_id, learning)?;
        }

        lc_state::recompute_session_status(session);

        Ok(response)
    }

    /// Drains `learning`'s session-scoped working lists into long-term
    /// storage (§4.8's single chokepoint, called after every
    /// learning-producing action).
    pub fn commit_learning(&self, learning: &mut Learning) -> Result<()> {
        lc_learning::commit_pending_learning_entries(&self.store, &self.project_name, learning)
    }

    /// Re-reads scene file(s), re-concatenating for multi-scene sessions,
    /// diffs against the session's stored text, and adjusts/stales
    /// findings from `current_index` onward, re-evaluating any that went
    /// stale (§4.7). Returns `None` if nothing changed on disk.
    pub async fn detect_and_apply_scene_changes(
        &self,
        session_id: Uuid,
        session: &mut Session,
        current_index: usize,
        old_scene_text: &str,
        model_config: ModelConfig,
    ) -> Result<Option<SceneChangeReport>> {
        let new_text = self.read_current_scene_content(&session.scene_paths)?;
        let Some(new_text) = new_text else { return Ok(None) };

        let old_hash = lc_persistence::scene_diff::scene_hash(old_scene_text);
        let new_hash = lc_persistence::scene_diff::scene_hash(&new_text);
        if old_hash == new_hash {
            return Ok(None);
        }

        let (_findings, summary) =
            self.store.apply_scene_change(session_id, old_scene_text, &new_text, current_index)?;
        session.findings = self.store.get_session(session_id)?.map(|s| s.findings).unwrap_or_default();
        session.scene_hash = new_hash;

        let mut re_evaluated = Vec::new();
        for idx in current_index..session.findings.len() {
            let stale = session.findings[idx].stale;
            let terminal_withdrawn_or_rejected = matches!(
                session.findings[idx].status,
                lc_domain::finding::FindingStatus::Withdrawn | lc_domain::finding::FindingStatus::Rejected
            );
            if !stale || terminal_withdrawn_or_rejected {
                continue;
            }
            let req = ReEvaluateRequest {
                stale_finding: session.findings[idx].clone(),
                updated_scene_text: new_text.clone(),
                minimal_context: Indexes::new(),
                model_config: model_config.clone(),
            };
            let result = self.core_client.re_evaluate(req).await?;
            match &result {
                ReEvaluateResponse::Updated { finding, .. } => session.findings[idx] = finding.clone(),
                ReEvaluateResponse::Withdrawn { reason, .. } => {
                    session.findings[idx].status = lc_domain::finding::FindingStatus::Withdrawn;
                    session.findings[idx].stale = false;
                    session.findings[idx].outcome_reason = format!("Withdrawn after re-evaluation: {reason}");
                }
            }
            self.store.persist_finding(session_id, &session.findings[idx])?;
            re_evaluated.push(result);
        }

        lc_state::recompute_session_status(session);

        Ok(Some(SceneChangeReport {
            changed: true,
            adjusted: summary.adjusted,
            stale: summary.stale,
            no_lines: summary.no_lines,
            re_evaluated,
        }))
    }

    /// The §4.7 "lighter variant":
    /// `ReviewCurrentFindingAgainstSceneEdits(session, currentIndex)`.
    /// Performs the same diff-and-remap across every finding from
    /// `current_index` onward as [`Self::detect_and_apply_scene_changes`],
    /// but only re-evaluates the single finding at `current_index` —
    /// grounded on
    /// `original_source/lit_platform/services/session_service.py::review_current_finding_against_scene_edits`,
    /// which re-evaluates that finding whenever its status isn't already
    /// terminal-withdrawn/rejected, regardless of whether its own line
    /// range happened to land in the stale set. Returns `None` if
    /// `current_index` is out of range or nothing changed on disk.
    pub async fn review_current_finding_against_scene_edits(
        &self,
        session_id: Uuid,
        session: &mut Session,
        current_index: usize,
        old_scene_text: &str,
        model_config: ModelConfig,
    ) -> Result<Option<SceneChangeReport>> {
        if current_index >= session.findings.len() {
            return Ok(None);
        }

        let new_text = self.read_current_scene_content(&session.scene_paths)?;
        let Some(new_text) = new_text else { return Ok(None) };

        let old_hash = lc_persistence::scene_diff::scene_hash(old_scene_text);
        let new_hash = lc_persistence::scene_diff::scene_hash(&new_text);
        if old_hash == new_hash {
            return Ok(None);
        }

        let (_findings, summary) =
            self.store.apply_scene_change(session_id, old_scene_text, &new_text, current_index)?;
        session.findings = self.store.get_session(session_id)?.map(|s| s.findings).unwrap_or_default();
        session.scene_hash = new_hash;

        let mut re_evaluated = Vec::new();
        let terminal_withdrawn_or_rejected = matches!(
            session.findings[current_index].status,
            lc_domain::finding::FindingStatus::Withdrawn | lc_domain::finding::FindingStatus::Rejected
        );
        if !terminal_withdrawn_or_rejected {
            let req = ReEvaluateRequest {
                stale_finding: session.findings[current_index].clone(),
                updated_scene_text: new_text.clone(),
                minimal_context: Indexes::new(),
                model_config: model_config.clone(),
            };
            let result = self.core_client.re_evaluate(req).await?;
            match &result {
                ReEvaluateResponse::Updated { finding, .. } => session.findings[current_index] = finding.clone(),
                ReEvaluateResponse::Withdrawn { reason, .. } => {
                    session.findings[current_index].status = lc_domain::finding::FindingStatus::Withdrawn;
                    session.findings[current_index].stale = false;
                    session.findings[current_index].outcome_reason =
                        format!("Withdrawn after re-evaluation: {reason}");
                }
            }
            self.store.persist_finding(session_id, &session.findings[current_index])?;
            re_evaluated.push(result);
        }

        lc_state::recompute_session_status(session);

        Ok(Some(SceneChangeReport {
            changed: true,
            adjusted: summary.adjusted,
            stale: summary.stale,
            no_lines: summary.no_lines,
            re_evaluated,
        }))
    }

    fn read_current_scene_content(&self, scene_paths: &[String]) -> Result<Option<String>> {
        if scene_paths.len() > 1 {
            let mut docs = Vec::with_capacity(scene_paths.len());
            for p in scene_paths {
                match load_scene_text(Path::new(p)) {
                    Ok(text) => docs.push((p.clone(), text)),
                    Err(_) => return Ok(None),
                }
            }
            let (text, _line_map) = concatenate_scenes(&docs);
            Ok(Some(text))
        } else {
            match scene_paths.first() {
                Some(p) => Ok(load_scene_text(Path::new(p)).ok()),
                None => Ok(None),
            }
        }
    }

    /// Index-context staleness re-check (§4.6). `baseline_hash` is the
    /// session's currently stored `index_context_hash`; `baseline_snapshot`
    /// is the per-file content that hash was computed over (the session's
    /// stored `index_context_snapshot`); `already_prompted` is the
    /// session's stored `index_rerun_prompted`.
    ///
    /// Grounded on `original_source/lit_platform/services/session_service.py::detect_index_context_changes`:
    /// the aggregate hash is only a cheap early-exit, `changed_files` comes
    /// from comparing each tracked file's content against the last
    /// recorded snapshot, not from re-listing every tracked file whenever
    /// the aggregate hash moves.
    pub fn check_index_context(
        &self,
        session_id: Uuid,
        baseline_hash: Option<&str>,
        baseline_snapshot: &Indexes,
        already_prompted: bool,
    ) -> Result<IndexContextCheck> {
        let current = load_indexes_from_project(&self.project_path);
        let current_hash = index_content_hash(&current);

        let Some(baseline) = baseline_hash else {
            self.store.update_index_context(session_id, current_hash.as_deref(), false, false, &[], &current)?;
            return Ok(IndexContextCheck::Unchanged);
        };

        if current_hash.as_deref() == Some(baseline) {
            return Ok(IndexContextCheck::Unchanged);
        }

        let changed_files: Vec<String> = lc_domain::prompt::INDEX_FILES
            .iter()
            .filter(|name| current.get(**name) != baseline_snapshot.get(**name))
            .map(|name| name.to_string())
            .collect();

        // A hash mismatch with no per-file diff can't happen for the index
        // set (LEARNING.md is excluded from it entirely, see
        // `index_content_hash`), but stay honest about it rather than
        // report a change with nothing to show for it.
        if changed_files.is_empty() {
            self.store.update_index_context(session_id, current_hash.as_deref(), false, false, &[], &current)?;
            return Ok(IndexContextCheck::Unchanged);
        }

        let should_prompt = !already_prompted;
        self.store.update_index_context(session_id, current_hash.as_deref(), true, true, &changed_files, &current)?;

        Ok(IndexContextCheck::Stale { changed_files, should_prompt })
    }

    /// Streaming discussion turn (§4.4's "streaming variant yields
    /// interleaved token events followed by a single done event"), used by
    /// the CLI's interactive loop to render the critic's reply as it
    /// arrives. This runs the discussion engine in-process rather than
    /// through `/v1/discuss` — the stateless wire contract has no
    /// streaming transport (§4.9 lists three request/response endpoints,
    /// not a streaming one), so a faithful token-by-token render can only
    /// happen on the side of the boundary that still holds the model
    /// registry. Side effects (learning, `discussion_turns`, auto-save)
    /// are applied once the stream reaches its terminal event, exactly
    /// like [`Self::discuss_finding`].
    pub async fn discuss_finding_streamed(
        &self,
        session_id: Uuid,
        session: &mut Session,
        learning: &mut Learning,
        registry: &lc_providers::registry::ModelRegistry,
        finding_number: u32,
        author_message: &str,
        scene_text: &str,
        scene_changed: bool,
        model_config: &ModelConfig,
        mut on_token: impl FnMut(&str),
    ) -> Result<lc_discussion::DiscussionStreamEvent> {
        use futures_util::StreamExt;

        let idx = session
            .findings
            .iter()
            .position(|f| f.number == finding_number)
            .ok_or_else(|| lc_domain::error::Error::Validation(format!("no finding numbered {finding_number}")))?;

        let numbered_scene = lc_pipeline::number_scene(scene_text);
        let prior_outcomes = lc_state::prior_outcomes_summary(&session.findings, finding_number);
        let (client, _model_used) = lc_core::service::resolve_client(registry, model_config)?;
        let prompt_builder = lc_domain::prompt::BasicPromptBuilder;

        let mut discussion_history_scratch = Vec::new();
        let mut terminal = None;
        {
            // Scoped so the stream (and the mutable borrow of
            // `session.findings[idx]` it holds) is dropped before this
            // method touches `session` again below.
            let finding = &mut session.findings[idx];
            let stream = lc_discussion::discuss_stream(
                &client,
                &prompt_builder,
                finding,
                &mut discussion_history_scratch,
                learning,
                &numbered_scene,
                &prior_outcomes,
                author_message,
                scene_changed,
            );
            futures_util::pin_mut!(stream);

            while let Some(event) = stream.next().await {
                match event {
                    lc_discussion::DiscussionStreamEvent::Token(ref text) => on_token(text),
                    lc_discussion::DiscussionStreamEvent::Done { .. } => terminal = Some(event),
                }
            }
        }
        let terminal = terminal
            .ok_or_else(|| lc_domain::error::Error::Other("discussion stream ended with no terminal event".to_string()))?;

        session.discussion_history.append(&mut discussion_history_scratch);
        self.store.persist_finding(session_id, &session.findings[idx])?;
        self.store.update_discussion_history(session_id, &session.discussion_history)?;
        self.persist_learning_session(session_id, learning)?;
        self.commit_learning(learning)?;
        self.persist_learning_session(session_id, learning)?;
        lc_state::recompute_session_status(session);

        Ok(terminal)
    }
}

/// Re-derives `lc_discussion::effects::apply_side_effects`'s learning
/// signal from a wire-level [`DiscussAction`] rather than the
/// `DiscussionStatus` enum directly, since only `legacy_status` and the
/// extracted-preference/ambiguity fields cross the stateless `/v1/discuss`
/// boundary. Returns `true` if any learning list grew, so the caller knows
/// whether a commit pass is worth running.
fn apply_discuss_action_to_learning(
    finding: &Finding,
    action: &DiscussAction,
    user_message: &str,
    learning: &mut Learning,
) -> bool {
    let before = learning.session_rejections.len() + learning.session_acceptances.len() + learning.session_ambiguity_answers.len();

    if let Some(classification) = &action.payload.ambiguity_classification {
        lc_state::record_ambiguity_answer(finding, learning, classification == "intentional");
    }

    match action.payload.legacy_status.as_str() {
        "rejected" | "conceded" => {
            lc_state::record_discussion_rejection(finding, learning, user_message, action.payload.extracted_preference.clone());
        }
        "accepted" => {
            lc_state::record_discussion_acceptance(finding, learning);
        }
        _ => {
            if let Some(rule) = &action.payload.extracted_preference {
                lc_state::record_discussion_rejection(finding, learning, user_message, Some(rule.clone()));
            }
        }
    }

    let after = learning.session_rejections.len() + learning.session_acceptances.len() + learning.session_ambiguity_answers.len();
    after > before
}

fn resolve_lens_preferences(
    preset_name: &str,
    scene_count: usize,
    weight_overrides: &HashMap<String, f64>,
) -> Result<LensPreferences> {
    let preset = match preset_name {
        "balanced" => LensPreset::Balanced,
        "prose-first" => LensPreset::ProseFirst,
        "story-logic" => LensPreset::StoryLogic,
        "clarity-pass" => LensPreset::ClarityPass,
        "single-scene" => LensPreset::SingleScene,
        "multi-scene" => LensPreset::MultiScene,
        "auto" => LensPreset::resolve_auto(scene_count),
        other => return Err(lc_domain::error::Error::Validation(format!("unknown lens preset '{other}'"))),
    };

    let mut overrides = HashMap::new();
    for (name, weight) in weight_overrides {
        let lens = Lens::parse(name).ok_or_else(|| lc_domain::error::Error::Validation(format!("unknown lens '{name}'")))?;
        overrides.insert(lens, *weight);
    }

    Ok(LensPreferences::from_preset(preset).with_overrides(&overrides))
}

fn lens_preferences_wire(
    resolved: &LensPreferences,
    original_preset_name: &str,
    weight_overrides: &HashMap<String, f64>,
) -> LensPreferencesWire {
    // `auto` must be resolved before the request is built (the core has no
    // way to know scene count), but the already-resolved concrete preset
    // name is what travels over the wire — `resolved.preset` always
    // reflects that resolution.
    let preset = if original_preset_name == "auto" {
        match resolved.preset {
            LensPreset::Balanced => "balanced",
            LensPreset::ProseFirst => "prose-first",
            LensPreset::StoryLogic => "story-logic",
            LensPreset::ClarityPass => "clarity-pass",
            LensPreset::SingleScene => "single-scene",
            LensPreset::MultiScene => "multi-scene",
        }
    } else {
        original_preset_name
    };
    LensPreferencesWire { preset: preset.to_string(), weight_overrides: weight_overrides.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lc_core::contracts::{AnalyzeResponse, DiscussResponse, ResponseMeta};
    use std::sync::Mutex;

    fn model_config() -> ModelConfig {
        ModelConfig {
            model: "sonnet".to_string(),
            api_keys: [("anthropic".to_string(), "sk-test".to_string())].into_iter().collect(),
            max_tokens: 4096,
            provider_options: None,
        }
    }

    fn sample_finding(number: u32) -> Finding {
        Finding {
            number,
            severity: lc_domain::finding::Severity::Major,
            lens: Lens::Continuity,
            location: "L2-L3".to_string(),
            line_start: Some(2),
            line_end: Some(3),
            scene_path: None,
            evidence: "the lantern is lit with no matches struck".to_string(),
            impact: "breaks established continuity".to_string(),
            options: vec!["add a match-striking beat".to_string()],
            flagged_by: vec![Lens::Continuity],
            ambiguity_type: None,
            stale: false,
            status: lc_domain::finding::FindingStatus::Pending,
            author_response: String::new(),
            discussion_turns: Vec::new(),
            revision_history: Vec::new(),
            outcome_reason: String::new(),
        }
    }

    struct ScriptedClient {
        analyze_findings: Vec<Finding>,
    }

    #[async_trait]
    impl CoreClient for ScriptedClient {
        async fn analyze(&self, _req: AnalyzeRequest) -> Result<AnalyzeResponse> {
            Ok(AnalyzeResponse {
                findings: self.analyze_findings.clone(),
                glossary_issues: Vec::new(),
                summary: serde_json::Map::new(),
                conflicts: Vec::new(),
                ambiguities: Vec::new(),
                meta: ResponseMeta { model_used: "claude-sonnet-4-20250514".to_string(), timings: None, token_usage: None },
            })
        }

        async fn discuss(&self, req: DiscussRequest) -> Result<DiscussResponse> {
            let mut finding = req.finding;
            finding.status = lc_domain::finding::FindingStatus::Accepted;
            finding.outcome_reason = "Accepted by author".to_string();
            Ok(DiscussResponse {
                assistant_response: "Understood, accepting.".to_string(),
                action: lc_core::contracts::DiscussAction {
                    kind: lc_core::contracts::ActionType::Defend,
                    payload: lc_core::contracts::DiscussActionPayload {
                        legacy_status: "accepted".to_string(),
                        extracted_preference: None,
                        ambiguity_classification: None,
                    },
                },
                updated_finding: finding,
                meta: ResponseMeta { model_used: "claude-sonnet-4-20250514".to_string(), timings: None, token_usage: None },
            })
        }

        async fn re_evaluate(&self, req: ReEvaluateRequest) -> Result<ReEvaluateResponse> {
            Ok(ReEvaluateResponse::Updated {
                finding: req.stale_finding,
                meta: ResponseMeta { model_used: "claude-sonnet-4-20250514".to_string(), timings: None, token_usage: None },
            })
        }
    }

    fn manager_with(dir: &tempfile::TempDir, findings: Vec<Finding>) -> SessionManager {
        let client: Arc<dyn CoreClient> = Arc::new(ScriptedClient { analyze_findings: findings });
        SessionManager::open(dir.path(), client).unwrap()
    }

    #[tokio::test]
    async fn start_session_persists_findings_from_single_scene() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\nthree\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);

        let report = manager
            .start_session(
                vec![dir.path().join("scene.md").to_string_lossy().into_owned()],
                model_config(),
                None,
                "auto",
                HashMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.session.findings.len(), 1);
        assert_eq!(report.session.lens_preferences.preset, LensPreset::SingleScene);
    }

    #[tokio::test]
    async fn start_session_multi_scene_attributes_findings_to_owning_scene() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "a1\na2\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "b1\nb2\n").unwrap();
        let mut finding = sample_finding(1);
        // global line 6 lands inside b.md (marker 1, a1/a2 2-3, blank 4, marker 5, b1 6).
        finding.line_start = Some(6);
        finding.line_end = Some(6);
        let manager = manager_with(&dir, vec![finding]);

        let a = dir.path().join("a.md").to_string_lossy().into_owned();
        let b = dir.path().join("b.md").to_string_lossy().into_owned();
        let report = manager
            .start_session(vec![a, b.clone()], model_config(), None, "auto", HashMap::new())
            .await
            .unwrap();

        assert_eq!(report.session.lens_preferences.preset, LensPreset::MultiScene);
        assert_eq!(report.session.findings[0].scene_path.as_deref(), Some(b.as_str()));
        assert_eq!(report.session.findings[0].line_start, Some(1));
    }

    #[tokio::test]
    async fn accept_finding_persists_and_recomputes_session_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let report = manager
            .start_session(
                vec![dir.path().join("scene.md").to_string_lossy().into_owned()],
                model_config(),
                None,
                "auto",
                HashMap::new(),
            )
            .await
            .unwrap();

        let mut session = report.session;
        let mut learning = Learning::new("proj".to_string());
        let finding = &mut session.findings[0];
        manager.accept_finding(session.session_id, finding, &mut learning).unwrap();

        let reloaded = manager.get_session(session.session_id).unwrap().unwrap();
        assert_eq!(reloaded.findings[0].status, lc_domain::finding::FindingStatus::Accepted);
        assert_eq!(reloaded.status, lc_domain::session::SessionStatus::Completed);
    }

    #[tokio::test]
    async fn reject_finding_commits_learning_preference_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let report = manager
            .start_session(
                vec![dir.path().join("scene.md").to_string_lossy().into_owned()],
                model_config(),
                None,
                "auto",
                HashMap::new(),
            )
            .await
            .unwrap();

        let mut session = report.session;
        let mut learning = Learning::new("proj".to_string());
        let finding = &mut session.findings[0];
        manager.reject_finding(session.session_id, finding, &mut learning, "intentional ambiguity").unwrap();

        assert!(learning.session_rejections.is_empty(), "commit should drain the working list");
        let persisted = manager.load_learning().unwrap();
        assert_eq!(persisted.preferences.len(), 1);
    }

    #[tokio::test]
    async fn discuss_finding_updates_status_and_discussion_history() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let report = manager
            .start_session(
                vec![dir.path().join("scene.md").to_string_lossy().into_owned()],
                model_config(),
                None,
                "auto",
                HashMap::new(),
            )
            .await
            .unwrap();

        let mut session = report.session;
        let mut learning = Learning::new("proj".to_string());
        manager
            .discuss_finding(
                session.session_id,
                &mut session,
                &mut learning,
                1,
                "fine, accepted",
                "one\ntwo\n",
                false,
                model_config(),
            )
            .await
            .unwrap();

        assert_eq!(session.findings[0].status, lc_domain::finding::FindingStatus::Accepted);
        assert_eq!(session.discussion_history.len(), 2);
        assert_eq!(session.status, lc_domain::session::SessionStatus::Completed);
        assert_eq!(learning.session_acceptances.len(), 1);
    }

    #[tokio::test]
    async fn check_index_context_flags_stale_only_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        std::fs::write(dir.path().join("CANON.md"), "v1").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let report = manager
            .start_session(
                vec![dir.path().join("scene.md").to_string_lossy().into_owned()],
                model_config(),
                None,
                "auto",
                HashMap::new(),
            )
            .await
            .unwrap();

        let baseline_session = manager.get_session(report.session.session_id).unwrap().unwrap();
        std::fs::write(dir.path().join("CANON.md"), "v2, the lantern now has matches").unwrap();

        let first = manager
            .check_index_context(
                report.session.session_id,
                baseline_session.index_context_hash.as_deref(),
                &baseline_session.index_context_snapshot,
                false,
            )
            .unwrap();
        match first {
            IndexContextCheck::Stale { should_prompt, changed_files } => {
                assert!(should_prompt);
                assert_eq!(changed_files, vec!["CANON".to_string()]);
            }
            other => panic!("expected stale, got {other:?}"),
        }

        let second = manager
            .check_index_context(
                report.session.session_id,
                baseline_session.index_context_hash.as_deref(),
                &baseline_session.index_context_snapshot,
                true,
            )
            .unwrap();
        match second {
            IndexContextCheck::Stale { should_prompt, changed_files } => {
                assert!(!should_prompt);
                assert_eq!(changed_files, vec!["CANON".to_string()]);
            }
            other => panic!("expected stale (already prompted), got {other:?}"),
        }
        let _ = Mutex::new(());
    }

    #[tokio::test]
    async fn validate_scene_state_accepts_unchanged_scene() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let scene_path = dir.path().join("scene.md").to_string_lossy().into_owned();
        let report = manager
            .start_session(vec![scene_path.clone()], model_config(), None, "auto", HashMap::new())
            .await
            .unwrap();

        let detail = SessionManager::validate_scene_state(&report.session, "one\ntwo\n", &[scene_path]);
        assert!(detail.is_none());
    }

    #[tokio::test]
    async fn validate_scene_state_flags_hash_drift() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let scene_path = dir.path().join("scene.md").to_string_lossy().into_owned();
        let report = manager
            .start_session(vec![scene_path.clone()], model_config(), None, "auto", HashMap::new())
            .await
            .unwrap();

        let detail = SessionManager::validate_scene_state(&report.session, "one\ntwo\nthree\n", &[scene_path]);
        assert!(detail.is_some());
        assert!(detail.unwrap().message.contains("modified"));
    }

    #[tokio::test]
    async fn validate_scene_state_flags_different_scene_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.md"), "one\ntwo\n").unwrap();
        std::fs::write(dir.path().join("other.md"), "one\ntwo\n").unwrap();
        let manager = manager_with(&dir, vec![sample_finding(1)]);
        let scene_path = dir.path().join("scene.md").to_string_lossy().into_owned();
        let other_path = dir.path().join("other.md").to_string_lossy().into_owned();
        let report = manager
            .start_session(vec![scene_path], model_config(), None, "auto", HashMap::new())
            .await
            .unwrap();

        let detail = SessionManager::validate_scene_state(&report.session, "one\ntwo\n", &[other_path]);
        assert!(detail.is_some());
        assert!(detail.unwrap().message.contains("scene set"));
    }
}
