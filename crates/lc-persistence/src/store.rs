//! Owns the one `rusqlite::Connection` per project that the Platform Facade
//! holds for the lifetime of a review session (§4.6, §5's "one persistence
//! connection per session" resource rule).

use std::path::Path;

use parking_lot::Mutex;
use uuid::Uuid;

use lc_domain::finding::{DiscussionTurn, Finding};
use lc_domain::learning::{Learning, LearningCategory, LearningSessionSnapshot};
use lc_domain::session::{LensPreferences, Session};
use lc_domain::Result;

use crate::{db, finding_repo, learning_repo, scene_diff, session_repo};

/// A `rusqlite` connection lock-guarded for the single project database
/// (`<project>/.lit-critic.db`). Every method retries 3 times with a linear
/// backoff on `SQLITE_BUSY`, matching the teacher's manual-retry convention
/// referenced in SPEC_FULL §4.9 rather than a `tower` retry layer.
pub struct ProjectStore {
    conn: Mutex<rusqlite::Connection>,
}

const LOCK_RETRY_ATTEMPTS: u32 = 3;
const LOCK_RETRY_BASE_DELAY_MS: u64 = 50;

impl ProjectStore {
    pub fn open(project_path: &Path) -> Result<Self> {
        let conn = db::open(project_path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Runs `f` against the connection, retrying on a transient SQLite lock
    /// with linear backoff (50ms, 100ms, 150ms) before giving up.
    fn with_retry<T>(&self, mut f: impl FnMut(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            let conn = self.conn.lock();
            match f(&conn) {
                Ok(v) => return Ok(v),
                Err(e) if attempt + 1 < LOCK_RETRY_ATTEMPTS && is_lock_error(&e) => {
                    drop(conn);
                    attempt += 1;
                    std::thread::sleep(std::time::Duration::from_millis(
                        LOCK_RETRY_BASE_DELAY_MS * attempt as u64,
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn create_session(
        &self,
        scene_paths: &[String],
        scene_hash: &str,
        model: &str,
        discussion_model: Option<&str>,
        lens_preferences: &LensPreferences,
    ) -> Result<Uuid> {
        self.with_retry(|conn| {
            session_repo::create(conn, scene_paths, scene_hash, model, discussion_model, lens_preferences)
        })
    }

    /// Loads the active session with its findings attached, or `None` if
    /// there is no active session for this project.
    pub fn load_active_session(&self) -> Result<Option<Session>> {
        self.with_retry(|conn| {
            let Some(mut session) = session_repo::load_active(conn)? else {
                return Ok(None);
            };
            session.findings = finding_repo::load_all(conn, session.session_id)?;
            Ok(Some(session))
        })
    }

    pub fn get_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.with_retry(|conn| {
            let Some(mut session) = session_repo::get(conn, session_id)? else {
                return Ok(None);
            };
            session.findings = finding_repo::load_all(conn, session.session_id)?;
            Ok(Some(session))
        })
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        self.with_retry(session_repo::list_all)
    }

    pub fn save_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<()> {
        self.with_retry(|conn| finding_repo::save_all(conn, session_id, findings))
    }

    /// Persists one finding's full state after a mutation, refreshes the
    /// session's derived counters, and re-syncs completion/reopen state —
    /// the auto-save chokepoint every state-machine call routes through
    /// (§4.5/§4.6, §8 invariant 2).
    pub fn persist_finding(&self, session_id: Uuid, finding: &Finding) -> Result<()> {
        self.with_retry(|conn| {
            finding_repo::replace(conn, session_id, finding)?;
            session_repo::update_counts(conn, session_id)?;
            let findings = finding_repo::load_all(conn, session_id)?;
            session_repo::sync_completion_state(conn, session_id, lc_state::all_findings_considered(&findings))
        })
    }

    pub fn persist_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<()> {
        self.with_retry(|conn| {
            finding_repo::replace_all(conn, session_id, findings)?;
            session_repo::update_counts(conn, session_id)?;
            let findings = finding_repo::load_all(conn, session_id)?;
            session_repo::sync_completion_state(conn, session_id, lc_state::all_findings_considered(&findings))
        })
    }

    pub fn update_current_index(&self, session_id: Uuid, index: usize) -> Result<()> {
        self.with_retry(|conn| session_repo::update_index(conn, session_id, index))
    }

    pub fn update_discussion_history(&self, session_id: Uuid, history: &[DiscussionTurn]) -> Result<()> {
        self.with_retry(|conn| session_repo::update_discussion_history(conn, session_id, history))
    }

    /// Persists the coordinator's glossary-check output onto the session
    /// row (§3's `Session.glossary_issues`).
    pub fn update_glossary_issues(&self, session_id: Uuid, issues: &[String]) -> Result<()> {
        self.with_retry(|conn| session_repo::update_glossary_issues(conn, session_id, issues))
    }

    /// Records the index-context staleness state the facade computes when a
    /// tracked markdown index changes mid-session (§4.6).
    pub fn update_index_context(
        &self,
        session_id: Uuid,
        index_context_hash: Option<&str>,
        stale: bool,
        rerun_prompted: bool,
        changed_files: &[String],
        snapshot: &lc_domain::prompt::Indexes,
    ) -> Result<()> {
        self.with_retry(|conn| {
            session_repo::update_index_context(
                conn,
                session_id,
                index_context_hash,
                stale,
                rerun_prompted,
                changed_files,
                snapshot,
            )
        })
    }

    /// Marks the session completed and increments the project's learning
    /// review count exactly once, per §4.8.
    pub fn complete_session(&self, session_id: Uuid, project_name: &str) -> Result<()> {
        self.with_retry(|conn| {
            session_repo::complete(conn, session_id)?;
            learning_repo::increment_review_count(conn, project_name)
        })
    }

    pub fn abandon_session(&self, session_id: Uuid) -> Result<()> {
        self.with_retry(|conn| session_repo::abandon(conn, session_id))
    }

    pub fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        self.with_retry(|conn| session_repo::delete(conn, session_id))
    }

    /// Applies a scene edit detected mid-session: remaps line ranges for
    /// every finding from `start_index` onward, persists the touched
    /// findings, and updates the session's scene hash (§4.7 steps 1-4; step
    /// 5's re-evaluation call is the caller's responsibility, since it needs
    /// an LLM round trip the persistence layer has no business making).
    pub fn apply_scene_change(
        &self,
        session_id: Uuid,
        old_text: &str,
        new_text: &str,
        start_index: usize,
    ) -> Result<(Vec<Finding>, scene_diff::SceneChangeSummary)> {
        self.with_retry(|conn| {
            let mut findings = finding_repo::load_all(conn, session_id)?;
            let summary = scene_diff::apply_scene_change(&mut findings, old_text, new_text, start_index);
            finding_repo::replace_all(conn, session_id, &findings)?;
            session_repo::update_scene(conn, session_id, &scene_diff::scene_hash(new_text))?;
            Ok((findings, summary))
        })
    }

    /// Writes the not-yet-committed learning working lists onto the session
    /// row, per §4.6/§4.8's `PersistSessionLearning` contract part (a).
    pub fn persist_learning_session(&self, session_id: Uuid, learning: &Learning) -> Result<()> {
        let snapshot = LearningSessionSnapshot::from_learning(learning);
        self.with_retry(|conn| session_repo::update_learning_session(conn, session_id, &snapshot))
    }

    /// Reads back a session's last persisted working-list snapshot (empty
    /// if none), for merging onto a freshly loaded `Learning` on resume.
    pub fn load_learning_session(&self, session_id: Uuid) -> Result<LearningSessionSnapshot> {
        self.with_retry(|conn| session_repo::load_learning_session(conn, session_id))
    }

    pub fn load_learning(&self, project_name: &str) -> Result<Learning> {
        self.with_retry(|conn| learning_repo::load(conn, project_name))
    }

    pub fn save_learning(&self, learning: &Learning) -> Result<()> {
        self.with_retry(|conn| learning_repo::save(conn, learning))
    }

    /// Appends one learning entry if no existing entry in the category
    /// already contains it as a substring (§4.8's idempotent-commit rule).
    /// Returns the new entry's id, or `None` if it was a duplicate.
    pub fn add_learning_entry_idempotent(
        &self,
        project_name: &str,
        category: LearningCategory,
        description: &str,
    ) -> Result<bool> {
        self.with_retry(|conn| learning_repo::add_entry_idempotent(conn, project_name, category, description))
    }

    pub fn export_learning_markdown(&self, project_name: &str) -> Result<String> {
        let learning = self.load_learning(project_name)?;
        Ok(crate::markdown::render(&learning))
    }

    /// Deletes all learning data for the project (`lit-critic learning reset`).
    pub fn reset_learning(&self) -> Result<()> {
        self.with_retry(learning_repo::reset)
    }
}

fn is_lock_error(err: &lc_domain::Error) -> bool {
    matches!(err, lc_domain::Error::Persistence(msg) if msg.contains("database is locked") || msg.contains("SQLITE_BUSY"))
}
