//! CRUD operations for review sessions.
//!
//! Grounded on `original_source/lit_platform/persistence/session_store.py`;
//! one free function per static method, operating on a borrowed
//! `rusqlite::Connection` exactly as the Python `SessionStore` operates on a
//! borrowed `sqlite3.Connection`.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use lc_domain::finding::DiscussionTurn;
use lc_domain::session::{LensPreferences, Session, SessionStatus};
use lc_domain::{Error, Result};

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

/// Inserts a new active session and returns its generated id.
pub fn create(
    conn: &rusqlite::Connection,
    scene_paths: &[String],
    scene_hash: &str,
    model: &str,
    discussion_model: Option<&str>,
    lens_preferences: &LensPreferences,
) -> Result<Uuid> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();
    conn.execute(
        "INSERT INTO session
           (session_id, scene_paths, scene_hash, model, discussion_model, lens_preferences, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            session_id.to_string(),
            serde_json::to_string(scene_paths).map_err(Error::Json)?,
            scene_hash,
            model,
            discussion_model,
            serde_json::to_string(lens_preferences).map_err(Error::Json)?,
            now.to_rfc3339(),
        ],
    )
    .map_err(sqlite_err)?;
    Ok(session_id)
}

const SESSION_COLUMNS: &str = "session_id, scene_paths, scene_hash, model, discussion_model, \
     current_index, status, glossary_issues, discussion_history, lens_preferences, \
     created_at, completed_at, total_findings, accepted_count, rejected_count, withdrawn_count, \
     index_context_hash, index_context_stale, index_rerun_prompted, index_changed_files, \
     index_context_snapshot";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let session_id: String = row.get(0)?;
    let scene_paths: String = row.get(1)?;
    let status: String = row.get(6)?;
    let glossary_issues: String = row.get(7)?;
    let discussion_history: String = row.get(8)?;
    let lens_preferences: String = row.get(9)?;
    let created_at: String = row.get(10)?;
    let completed_at: Option<String> = row.get(11)?;
    let index_context_hash: Option<String> = row.get(16)?;
    let index_context_stale: i64 = row.get(17)?;
    let index_rerun_prompted: i64 = row.get(18)?;
    let index_changed_files: String = row.get(19)?;
    let index_context_snapshot: String = row.get(20)?;

    let glossary_issues: Vec<String> = serde_json::from_str(&glossary_issues).unwrap_or_default();
    let discussion_history: Vec<DiscussionTurn> =
        serde_json::from_str(&discussion_history).unwrap_or_default();
    let scene_paths: Vec<String> = serde_json::from_str(&scene_paths).unwrap_or_default();
    let index_changed_files: Vec<String> = serde_json::from_str(&index_changed_files).unwrap_or_default();
    let index_context_snapshot: lc_domain::prompt::Indexes =
        serde_json::from_str(&index_context_snapshot).unwrap_or_default();
    let lens_preferences: LensPreferences = serde_json::from_str(&lens_preferences).unwrap_or_else(|_| {
        LensPreferences::from_preset(lc_domain::session::LensPreset::Balanced)
    });

    let status = match status.as_str() {
        "completed" => SessionStatus::Completed,
        "abandoned" => SessionStatus::Abandoned,
        _ => SessionStatus::Active,
    };

    Ok(Session {
        session_id: Uuid::parse_str(&session_id).unwrap_or_else(|_| Uuid::nil()),
        scene_paths,
        scene_hash: row.get(2)?,
        model: row.get(3)?,
        discussion_model: row.get(4)?,
        current_index: row.get::<_, i64>(5)? as usize,
        status,
        findings: Vec::new(),
        glossary_issues,
        discussion_history,
        lens_preferences,
        index_context_hash,
        index_context_stale: index_context_stale != 0,
        index_rerun_prompted: index_rerun_prompted != 0,
        index_changed_files,
        index_context_snapshot,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        completed_at: completed_at.and_then(|c| c.parse().ok()),
        counters: lc_domain::session::SessionCounters::default(),
    })
}

/// Loads the currently active session, if any. `findings` is left empty —
/// callers load findings separately via `finding_repo` and recompute
/// counters with `lc_state::recompute_session_status`.
pub fn load_active(conn: &rusqlite::Connection) -> Result<Option<Session>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM session WHERE status = 'active' ORDER BY rowid DESC LIMIT 1");
    conn.query_row(&sql, [], row_to_session).optional().map_err(sqlite_err)
}

pub fn exists_active(conn: &rusqlite::Connection) -> Result<bool> {
    conn.query_row("SELECT 1 FROM session WHERE status = 'active' LIMIT 1", [], |_| Ok(()))
        .optional()
        .map(|r| r.is_some())
        .map_err(sqlite_err)
}

pub fn get(conn: &rusqlite::Connection, session_id: Uuid) -> Result<Option<Session>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM session WHERE session_id = ?1");
    conn.query_row(&sql, params![session_id.to_string()], row_to_session)
        .optional()
        .map_err(sqlite_err)
}

pub fn list_all(conn: &rusqlite::Connection) -> Result<Vec<Session>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM session ORDER BY rowid DESC");
    let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
    let sessions = stmt
        .query_map([], row_to_session)
        .map_err(sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)?;
    Ok(sessions)
}

pub fn update_index(conn: &rusqlite::Connection, session_id: Uuid, current_index: usize) -> Result<()> {
    conn.execute(
        "UPDATE session SET current_index = ?1 WHERE session_id = ?2",
        params![current_index as i64, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn update_glossary_issues(conn: &rusqlite::Connection, session_id: Uuid, issues: &[String]) -> Result<()> {
    conn.execute(
        "UPDATE session SET glossary_issues = ?1 WHERE session_id = ?2",
        params![serde_json::to_string(issues).map_err(Error::Json)?, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn update_discussion_history(
    conn: &rusqlite::Connection,
    session_id: Uuid,
    history: &[DiscussionTurn],
) -> Result<()> {
    conn.execute(
        "UPDATE session SET discussion_history = ?1 WHERE session_id = ?2",
        params![serde_json::to_string(history).map_err(Error::Json)?, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn update_scene(conn: &rusqlite::Connection, session_id: Uuid, scene_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE session SET scene_hash = ?1 WHERE session_id = ?2",
        params![scene_hash, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn update_scene_paths(conn: &rusqlite::Connection, session_id: Uuid, scene_paths: &[String]) -> Result<()> {
    conn.execute(
        "UPDATE session SET scene_paths = ?1 WHERE session_id = ?2",
        params![serde_json::to_string(scene_paths).map_err(Error::Json)?, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn update_index_context(
    conn: &rusqlite::Connection,
    session_id: Uuid,
    index_context_hash: Option<&str>,
    stale: bool,
    rerun_prompted: bool,
    changed_files: &[String],
    snapshot: &lc_domain::prompt::Indexes,
) -> Result<()> {
    conn.execute(
        "UPDATE session SET index_context_hash = ?1, index_context_stale = ?2, \
         index_rerun_prompted = ?3, index_changed_files = ?4, index_context_snapshot = ?5 WHERE session_id = ?6",
        params![
            index_context_hash,
            stale as i64,
            rerun_prompted as i64,
            serde_json::to_string(changed_files).map_err(Error::Json)?,
            serde_json::to_string(snapshot).map_err(Error::Json)?,
            session_id.to_string(),
        ],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Recalculates and updates finding counts for a session from the `finding`
/// table (`SessionStore.update_counts`).
pub fn update_counts(conn: &rusqlite::Connection, session_id: Uuid) -> Result<()> {
    let (total, accepted, rejected, withdrawn): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), \
                    SUM(CASE WHEN status = 'accepted' THEN 1 ELSE 0 END), \
                    SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END), \
                    SUM(CASE WHEN status = 'withdrawn' THEN 1 ELSE 0 END) \
             FROM finding WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0), row.get::<_, Option<i64>>(2)?.unwrap_or(0), row.get::<_, Option<i64>>(3)?.unwrap_or(0))),
        )
        .map_err(sqlite_err)?;

    conn.execute(
        "UPDATE session SET total_findings = ?1, accepted_count = ?2, rejected_count = ?3, withdrawn_count = ?4 \
         WHERE session_id = ?5",
        params![total, accepted, rejected, withdrawn, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Marks a session completed and tallies final stats, per §4.5's
/// completion invariant.
pub fn complete(conn: &rusqlite::Connection, session_id: Uuid) -> Result<()> {
    update_counts(conn, session_id)?;
    conn.execute(
        "UPDATE session SET status = 'completed', completed_at = ?1 WHERE session_id = ?2",
        params![Utc::now().to_rfc3339(), session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Re-opens a completed session (§8 invariant 2: a finding reverting to
/// non-terminal status reopens the session).
pub fn reopen(conn: &rusqlite::Connection, session_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE session SET status = 'active', completed_at = NULL WHERE session_id = ?1",
        params![session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

fn get_status(conn: &rusqlite::Connection, session_id: Uuid) -> Result<Option<SessionStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM session WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite_err)?;
    Ok(status.map(|s| match s.as_str() {
        "completed" => SessionStatus::Completed,
        "abandoned" => SessionStatus::Abandoned,
        _ => SessionStatus::Active,
    }))
}

/// Keeps the persisted status aligned with finding terminality after every
/// finding mutation, mirroring `_sync_session_completion_state` in
/// `original_source/lit_platform/runtime/session.py`: completes the session
/// when every finding has gone terminal, reopens it when a previously
/// completed session has a finding regress to non-terminal (§8 invariant 2).
/// Does not touch the learning review count — that increments exactly once,
/// only on the intentional completion path (`complete_session`), the same
/// split the original keeps between `SessionStore.complete` and
/// `LearningStore.increment_review_count`.
pub fn sync_completion_state(conn: &rusqlite::Connection, session_id: Uuid, all_considered: bool) -> Result<()> {
    let Some(status) = get_status(conn, session_id)? else { return Ok(()) };
    if status == SessionStatus::Abandoned {
        return Ok(());
    }
    if all_considered && status != SessionStatus::Completed {
        complete(conn, session_id)?;
    } else if !all_considered && status == SessionStatus::Completed {
        reopen(conn, session_id)?;
    }
    Ok(())
}

pub fn abandon(conn: &rusqlite::Connection, session_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE session SET status = 'abandoned', completed_at = ?1 WHERE session_id = ?2",
        params![Utc::now().to_rfc3339(), session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn delete(conn: &rusqlite::Connection, session_id: Uuid) -> Result<bool> {
    let affected = conn
        .execute("DELETE FROM session WHERE session_id = ?1", params![session_id.to_string()])
        .map_err(sqlite_err)?;
    Ok(affected > 0)
}

/// Validates that a saved session still matches the current scene, per
/// `SessionStore.validate` — used on resume to detect out-of-band edits.
pub fn validate_scene_match(saved_scene_hash: &str, current_scene_hash: &str) -> std::result::Result<(), String> {
    if saved_scene_hash != current_scene_hash {
        return Err("scene file has been modified since the session was saved".to_string());
    }
    Ok(())
}

/// Writes the raw, not-yet-committed `Learning` working lists onto the
/// session row (`SessionStore.update_learning_session` in
/// `original_source/lit_platform/persistence/session_store.py`). Part (a)
/// of `PersistSessionLearning`'s two-part commit contract (§4.6, §4.8):
/// crash recovery for signals recorded between a review action and the
/// next drain into `learning_entry`.
pub fn update_learning_session(
    conn: &rusqlite::Connection,
    session_id: Uuid,
    snapshot: &lc_domain::learning::LearningSessionSnapshot,
) -> Result<()> {
    conn.execute(
        "UPDATE session SET learning_session = ?1 WHERE session_id = ?2",
        params![serde_json::to_string(snapshot).map_err(Error::Json)?, session_id.to_string()],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Reads back the raw working-list snapshot for a session, defaulting to
/// empty lists if the column is absent or unparsable (fresh session, or a
/// value predating this column).
pub fn load_learning_session(
    conn: &rusqlite::Connection,
    session_id: Uuid,
) -> Result<lc_domain::learning::LearningSessionSnapshot> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT learning_session FROM session WHERE session_id = ?1",
            params![session_id.to_string()],
            |r| r.get(0),
        )
        .optional()
        .map_err(sqlite_err)?
        .flatten();
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default())
}
