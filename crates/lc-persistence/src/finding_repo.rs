//! CRUD operations for findings within a session.
//!
//! Grounded on `original_source/lit_platform/persistence/finding_store.py`.
//! Unlike the Python original's dynamic `**fields` partial update, findings
//! are replaced whole-row on every save — the auto-save-after-every-mutation
//! contract (§4.6) always has the complete in-memory `Finding` at hand, so a
//! typed `replace` is simpler and just as correct as a field allowlist.

use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use lc_domain::finding::{
    AmbiguityType, DiscussionTurn, Finding, FindingStatus, Lens, RevisionSnapshot, Severity,
};
use lc_domain::{Error, Result};

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

const FINDING_COLUMNS: &str = "number, severity, lens, location, line_start, line_end, scene_path, \
     evidence, impact, options, flagged_by, ambiguity_type, stale, status, author_response, \
     discussion_turns, revision_history, outcome_reason";

fn row_to_finding(row: &Row<'_>) -> rusqlite::Result<Finding> {
    let severity: String = row.get(1)?;
    let lens: String = row.get(2)?;
    let options: String = row.get(9)?;
    let flagged_by: String = row.get(10)?;
    let ambiguity_type: Option<String> = row.get(11)?;
    let stale: i64 = row.get(12)?;
    let status: String = row.get(13)?;
    let discussion_turns: String = row.get(15)?;
    let revision_history: String = row.get(16)?;

    Ok(Finding {
        number: row.get::<_, i64>(0)? as u32,
        severity: Severity::coerce(&severity),
        lens: Lens::parse(&lens).unwrap_or(Lens::Prose),
        location: row.get(3)?,
        line_start: row.get::<_, Option<i64>>(4)?.map(|n| n as u32),
        line_end: row.get::<_, Option<i64>>(5)?.map(|n| n as u32),
        scene_path: row.get(6)?,
        evidence: row.get(7)?,
        impact: row.get(8)?,
        options: serde_json::from_str(&options).unwrap_or_default(),
        flagged_by: serde_json::from_str::<Vec<String>>(&flagged_by)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| Lens::parse(&s))
            .collect(),
        ambiguity_type: ambiguity_type.and_then(|t| match t.as_str() {
            "unclear" => Some(AmbiguityType::Unclear),
            "ambiguous_possibly_intentional" => Some(AmbiguityType::AmbiguousPossiblyIntentional),
            _ => None,
        }),
        stale: stale != 0,
        status: parse_status(&status),
        author_response: row.get(14)?,
        discussion_turns: serde_json::from_str::<Vec<DiscussionTurn>>(&discussion_turns).unwrap_or_default(),
        revision_history: serde_json::from_str::<Vec<RevisionSnapshot>>(&revision_history).unwrap_or_default(),
        outcome_reason: row.get(17)?,
    })
}

fn parse_status(raw: &str) -> FindingStatus {
    match raw {
        "accepted" => FindingStatus::Accepted,
        "rejected" => FindingStatus::Rejected,
        "revised" => FindingStatus::Revised,
        "withdrawn" => FindingStatus::Withdrawn,
        "escalated" => FindingStatus::Escalated,
        _ => FindingStatus::Pending,
    }
}

fn status_str(status: FindingStatus) -> &'static str {
    match status {
        FindingStatus::Pending => "pending",
        FindingStatus::Accepted => "accepted",
        FindingStatus::Rejected => "rejected",
        FindingStatus::Revised => "revised",
        FindingStatus::Withdrawn => "withdrawn",
        FindingStatus::Escalated => "escalated",
    }
}

fn ambiguity_str(t: Option<AmbiguityType>) -> Option<&'static str> {
    match t {
        Some(AmbiguityType::Unclear) => Some("unclear"),
        Some(AmbiguityType::AmbiguousPossiblyIntentional) => Some("ambiguous_possibly_intentional"),
        None => None,
    }
}

/// Bulk-inserts every finding for a session, e.g. after the pipeline's
/// dedup+renumber step produces the session's final finding list.
pub fn save_all(conn: &rusqlite::Connection, session_id: Uuid, findings: &[Finding]) -> Result<()> {
    let sid = session_id.to_string();
    for f in findings {
        conn.execute(
            "INSERT INTO finding
               (session_id, number, severity, lens, location, line_start, line_end, scene_path,
                evidence, impact, options, flagged_by, ambiguity_type, stale, status,
                author_response, discussion_turns, revision_history, outcome_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                sid,
                f.number,
                f.severity.to_string(),
                f.lens.as_str(),
                f.location,
                f.line_start,
                f.line_end,
                f.scene_path,
                f.evidence,
                f.impact,
                serde_json::to_string(&f.options).map_err(Error::Json)?,
                serde_json::to_string(&f.flagged_by.iter().map(|l| l.as_str()).collect::<Vec<_>>())
                    .map_err(Error::Json)?,
                ambiguity_str(f.ambiguity_type),
                f.stale as i64,
                status_str(f.status),
                f.author_response,
                serde_json::to_string(&f.discussion_turns).map_err(Error::Json)?,
                serde_json::to_string(&f.revision_history).map_err(Error::Json)?,
                f.outcome_reason,
            ],
        )
        .map_err(sqlite_err)?;
    }
    Ok(())
}

pub fn load_all(conn: &rusqlite::Connection, session_id: Uuid) -> Result<Vec<Finding>> {
    let sql = format!("SELECT {FINDING_COLUMNS} FROM finding WHERE session_id = ?1 ORDER BY number");
    let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
    let findings = stmt
        .query_map(params![session_id.to_string()], row_to_finding)
        .map_err(sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)?;
    Ok(findings)
}

pub fn get(conn: &rusqlite::Connection, session_id: Uuid, number: u32) -> Result<Option<Finding>> {
    let sql = format!("SELECT {FINDING_COLUMNS} FROM finding WHERE session_id = ?1 AND number = ?2");
    conn.query_row(&sql, params![session_id.to_string(), number], row_to_finding)
        .optional()
        .map_err(sqlite_err)
}

/// Replaces the full row for one finding, by session + number. Used after
/// any state-machine mutation (accept/reject/discuss/re-evaluate), matching
/// the auto-save-after-every-mutation contract.
pub fn replace(conn: &rusqlite::Connection, session_id: Uuid, finding: &Finding) -> Result<()> {
    conn.execute(
        "UPDATE finding SET
           severity = ?1, lens = ?2, location = ?3, line_start = ?4, line_end = ?5,
           scene_path = ?6, evidence = ?7, impact = ?8, options = ?9, flagged_by = ?10,
           ambiguity_type = ?11, stale = ?12, status = ?13, author_response = ?14,
           discussion_turns = ?15, revision_history = ?16, outcome_reason = ?17
         WHERE session_id = ?18 AND number = ?19",
        params![
            finding.severity.to_string(),
            finding.lens.as_str(),
            finding.location,
            finding.line_start,
            finding.line_end,
            finding.scene_path,
            finding.evidence,
            finding.impact,
            serde_json::to_string(&finding.options).map_err(Error::Json)?,
            serde_json::to_string(&finding.flagged_by.iter().map(|l| l.as_str()).collect::<Vec<_>>())
                .map_err(Error::Json)?,
            ambiguity_str(finding.ambiguity_type),
            finding.stale as i64,
            status_str(finding.status),
            finding.author_response,
            serde_json::to_string(&finding.discussion_turns).map_err(Error::Json)?,
            serde_json::to_string(&finding.revision_history).map_err(Error::Json)?,
            finding.outcome_reason,
            session_id.to_string(),
            finding.number,
        ],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Replaces every finding in the session in one pass, e.g. after a
/// scene-change detector run touches several findings at once.
pub fn replace_all(conn: &rusqlite::Connection, session_id: Uuid, findings: &[Finding]) -> Result<()> {
    for f in findings {
        replace(conn, session_id, f)?;
    }
    Ok(())
}
