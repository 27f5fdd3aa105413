//! CRUD operations for cross-session learning data (§4.8).
//!
//! Grounded on `original_source/lit_platform/persistence/learning_store.py`.
//! A project has at most one `learning` row; `ensure_exists` creates it
//! lazily on first use, matching the Python original.

use chrono::Utc;
use rusqlite::params;

use lc_domain::learning::{Learning, LearningCategory, LearningEntry};
use lc_domain::{Error, Result};

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

/// Ensures a `learning` row exists for the project, returning its id.
pub fn ensure_exists(conn: &rusqlite::Connection, project_name: &str) -> Result<i64> {
    if let Some(id) = conn
        .query_row("SELECT id FROM learning LIMIT 1", [], |r| r.get::<_, i64>(0))
        .optional_ok()?
    {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO learning (project_name, updated_at) VALUES (?1, ?2)",
        params![project_name, Utc::now().to_rfc3339()],
    )
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

trait OptionalOk<T> {
    fn optional_ok(self) -> Result<Option<T>>;
}

impl<T> OptionalOk<T> for rusqlite::Result<T> {
    fn optional_ok(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(sqlite_err(e)),
        }
    }
}

/// Loads the full learning record, grouped by category, for a project.
pub fn load(conn: &rusqlite::Connection, project_name: &str) -> Result<Learning> {
    let row = conn
        .query_row(
            "SELECT id, project_name, review_count FROM learning LIMIT 1",
            [],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?)),
        )
        .optional_ok()?;

    let Some((learning_id, project_name, review_count)) = row else {
        return Ok(Learning::new(project_name.to_string()));
    };

    let mut learning = Learning::new(project_name);
    learning.review_count = review_count as u32;

    for category in LearningCategory::ALL {
        let entries = load_entries(conn, learning_id, category)?;
        *learning.category_mut(category) = entries;
    }

    Ok(learning)
}

fn load_entries(
    conn: &rusqlite::Connection,
    learning_id: i64,
    category: LearningCategory,
) -> Result<Vec<LearningEntry>> {
    let mut stmt = conn
        .prepare("SELECT id, description FROM learning_entry WHERE learning_id = ?1 AND category = ?2 ORDER BY id")
        .map_err(sqlite_err)?;
    let entries = stmt
        .query_map(params![learning_id, category.as_str()], |row| {
            Ok(LearningEntry {
                id: row.get::<_, i64>(0)? as u32,
                description: row.get(1)?,
            })
        })
        .map_err(sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)?;
    Ok(entries)
}

/// Persists a full `Learning` snapshot: replaces `project_name`,
/// `review_count`, and every entry list (`LearningStore.save_from_learning_data`).
pub fn save(conn: &rusqlite::Connection, learning: &Learning) -> Result<()> {
    let learning_id = ensure_exists(conn, &learning.project_name)?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "UPDATE learning SET project_name = ?1, review_count = ?2, updated_at = ?3 WHERE id = ?4",
        params![learning.project_name, learning.review_count, now, learning_id],
    )
    .map_err(sqlite_err)?;

    conn.execute("DELETE FROM learning_entry WHERE learning_id = ?1", params![learning_id])
        .map_err(sqlite_err)?;

    for category in LearningCategory::ALL {
        for entry in learning.category(category) {
            conn.execute(
                "INSERT INTO learning_entry (learning_id, category, description, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![learning_id, category.as_str(), entry.description, now],
            )
            .map_err(sqlite_err)?;
        }
    }

    Ok(())
}

/// Appends one entry if no existing entry in the category already contains
/// it as a substring (§4.8's idempotent-commit rule). Returns `true` if a
/// new entry was inserted.
pub fn add_entry_idempotent(
    conn: &rusqlite::Connection,
    project_name: &str,
    category: LearningCategory,
    description: &str,
) -> Result<bool> {
    let learning_id = ensure_exists(conn, project_name)?;
    let existing = load_entries(conn, learning_id, category)?;
    if existing.iter().any(|e| e.description.contains(description) || description.contains(&e.description)) {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO learning_entry (learning_id, category, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![learning_id, category.as_str(), description, Utc::now().to_rfc3339()],
    )
    .map_err(sqlite_err)?;
    Ok(true)
}

/// Increments the review count by 1 (called exactly once, at session
/// completion, per §4.8).
pub fn increment_review_count(conn: &rusqlite::Connection, project_name: &str) -> Result<()> {
    let learning_id = ensure_exists(conn, project_name)?;
    conn.execute(
        "UPDATE learning SET review_count = review_count + 1, updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), learning_id],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Deletes all learning data for the project (used by `lit-critic learning reset`).
pub fn reset(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute("DELETE FROM learning_entry", []).map_err(sqlite_err)?;
    conn.execute("DELETE FROM learning", []).map_err(sqlite_err)?;
    Ok(())
}
