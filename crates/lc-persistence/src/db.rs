//! Connection setup and schema migrations.
//!
//! Mirrors `original_source/lit_platform/persistence/database.py`: a single
//! SQLite file per project, WAL mode, foreign keys on, and idempotent
//! column-presence-guarded migrations up to schema version 5.

use std::path::Path;

use rusqlite::Connection;

use lc_domain::{Error, Result};

pub const SCHEMA_VERSION: i64 = 5;

const DB_FILE: &str = ".lit-critic.db";

pub fn db_path(project_path: &Path) -> std::path::PathBuf {
    project_path.join(DB_FILE)
}

/// Opens (or creates) the project database and brings its schema up to
/// date. WAL mode and foreign keys are enabled on every connection, per
/// the teacher's connection-setup convention.
pub fn open(project_path: &Path) -> Result<Connection> {
    let path = db_path(project_path);
    let conn = Connection::open(&path).map_err(sqlite_err)?;
    conn.pragma_update(None, "journal_mode", "WAL").map_err(sqlite_err)?;
    conn.pragma_update(None, "foreign_keys", "ON").map_err(sqlite_err)?;
    init_db(&conn)?;
    Ok(conn)
}

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

/// Creates tables if absent and applies migrations in sequence, each
/// guarded by a `PRAGMA table_info` column-presence check so a partially
/// migrated database is brought the rest of the way rather than failing.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(sqlite_err)?;

    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .map_err(sqlite_err)?;

    if !table_has_column(conn, "session", "lens_preferences")? {
        migrate_add_lens_preferences(conn)?;
    }
    if !table_has_column(conn, "finding", "scene_path")? {
        migrate_add_finding_scene_path(conn)?;
    }
    let needs_index_fields = !table_has_column(conn, "session", "index_context_hash")?
        || !table_has_column(conn, "session", "index_context_stale")?
        || !table_has_column(conn, "session", "index_rerun_prompted")?
        || !table_has_column(conn, "session", "index_changed_files")?
        || !table_has_column(conn, "session", "index_context_snapshot")?;
    if needs_index_fields {
        migrate_add_index_context_fields(conn)?;
    }

    if current < SCHEMA_VERSION {
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )
        .map_err(sqlite_err)?;
    }

    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let sql = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
    let found = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(sqlite_err)?
        .filter_map(std::result::Result::ok)
        .any(|name| name == column);
    Ok(found)
}

fn migrate_add_lens_preferences(conn: &Connection) -> Result<()> {
    tracing::info!("applying migration: add session.lens_preferences");
    conn.execute_batch(
        "ALTER TABLE session ADD COLUMN lens_preferences TEXT DEFAULT '{}';
         UPDATE session SET lens_preferences = '{}' WHERE lens_preferences IS NULL;",
    )
    .map_err(sqlite_err)
}

fn migrate_add_finding_scene_path(conn: &Connection) -> Result<()> {
    tracing::info!("applying migration: add finding.scene_path");
    conn.execute("ALTER TABLE finding ADD COLUMN scene_path TEXT", [])
        .map_err(sqlite_err)?;
    Ok(())
}

fn migrate_add_index_context_fields(conn: &Connection) -> Result<()> {
    tracing::info!("applying migration: add session index-context fields");
    if !table_has_column(conn, "session", "index_context_hash")? {
        conn.execute("ALTER TABLE session ADD COLUMN index_context_hash TEXT DEFAULT ''", [])
            .map_err(sqlite_err)?;
    }
    if !table_has_column(conn, "session", "index_context_stale")? {
        conn.execute("ALTER TABLE session ADD COLUMN index_context_stale INTEGER DEFAULT 0", [])
            .map_err(sqlite_err)?;
    }
    if !table_has_column(conn, "session", "index_rerun_prompted")? {
        conn.execute("ALTER TABLE session ADD COLUMN index_rerun_prompted INTEGER DEFAULT 0", [])
            .map_err(sqlite_err)?;
    }
    if !table_has_column(conn, "session", "index_changed_files")? {
        conn.execute("ALTER TABLE session ADD COLUMN index_changed_files TEXT DEFAULT '[]'", [])
            .map_err(sqlite_err)?;
    }
    if !table_has_column(conn, "session", "index_context_snapshot")? {
        conn.execute("ALTER TABLE session ADD COLUMN index_context_snapshot TEXT DEFAULT '{}'", [])
            .map_err(sqlite_err)?;
    }
    Ok(())
}

/// Base schema. `session.session_id` is a UUID text primary key rather than
/// the Python original's autoincrement integer, so a session can be named
/// consistently across the stateless Core Service boundary without a local
/// sequence leaking into the wire contract.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS session (
    session_id TEXT PRIMARY KEY,
    scene_paths TEXT NOT NULL DEFAULT '[]',
    scene_hash TEXT NOT NULL,
    model TEXT NOT NULL,
    discussion_model TEXT,
    current_index INTEGER DEFAULT 0,
    status TEXT DEFAULT 'active',
    glossary_issues TEXT DEFAULT '[]',
    discussion_history TEXT DEFAULT '[]',
    learning_session TEXT DEFAULT '{}',
    created_at TEXT NOT NULL,
    completed_at TEXT,
    total_findings INTEGER DEFAULT 0,
    accepted_count INTEGER DEFAULT 0,
    rejected_count INTEGER DEFAULT 0,
    withdrawn_count INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS finding (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES session(session_id) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    severity TEXT NOT NULL,
    lens TEXT NOT NULL,
    location TEXT DEFAULT '',
    line_start INTEGER,
    line_end INTEGER,
    evidence TEXT DEFAULT '',
    impact TEXT DEFAULT '',
    options TEXT DEFAULT '[]',
    flagged_by TEXT DEFAULT '[]',
    ambiguity_type TEXT,
    stale INTEGER DEFAULT 0,
    status TEXT DEFAULT 'pending',
    author_response TEXT DEFAULT '',
    discussion_turns TEXT DEFAULT '[]',
    revision_history TEXT DEFAULT '[]',
    outcome_reason TEXT DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_finding_session ON finding(session_id);

CREATE TABLE IF NOT EXISTS learning (
    id INTEGER PRIMARY KEY,
    project_name TEXT DEFAULT 'Unknown',
    review_count INTEGER DEFAULT 0,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS learning_entry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    learning_id INTEGER NOT NULL REFERENCES learning(id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_learning_entry_category ON learning_entry(category);
";
