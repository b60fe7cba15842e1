use rusqlite::Connection;

use crate::error::Result;
use crate::models::{ImportRun, RunStatus};

/// Final counters for one ingestion invocation.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
    /// Present only for fatal failures (nothing was processed).
    pub error_message: Option<String>,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        if self.error_message.is_some() {
            RunStatus::Failed
        } else if self.errored > 0 && self.imported > 0 {
            RunStatus::Partial
        } else if self.errored > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        }
    }
}

/// Open an audit record for an ingestion invocation. Callers must pair every
/// `start` with exactly one `complete`; the tracker does not police this.
pub fn start(
    conn: &Connection,
    source_type: &str,
    source_name: &str,
    triggered_by: &str,
    checksum: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO import_runs (source_type, source_name, triggered_by, status, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            source_type,
            source_name,
            triggered_by,
            RunStatus::Running.as_str(),
            checksum,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn complete(conn: &Connection, run_id: i64, outcome: &RunOutcome) -> Result<()> {
    conn.execute(
        "UPDATE import_runs SET status = ?1, rows_imported = ?2, rows_skipped = ?3, \
         rows_errored = ?4, error_message = ?5, completed_at = datetime('now') WHERE id = ?6",
        rusqlite::params![
            outcome.status().as_str(),
            outcome.imported as i64,
            outcome.skipped as i64,
            outcome.errored as i64,
            outcome.error_message,
            run_id,
        ],
    )?;
    Ok(())
}

/// Has a completed or partial run already ingested a file with this checksum
/// for this source? Failed runs don't count: a crashed import may be retried.
pub fn checksum_seen(conn: &Connection, source_name: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM import_runs WHERE source_name = ?1 AND checksum = ?2 \
         AND status IN ('completed', 'partial')",
    )?;
    Ok(stmt.exists(rusqlite::params![source_name, checksum])?)
}

pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<ImportRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_type, source_name, triggered_by, status, rows_imported, \
                rows_skipped, rows_errored, started_at, completed_at, error_message \
         FROM import_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(ImportRun {
            id: row.get(0)?,
            source_type: row.get(1)?,
            source_name: row.get(2)?,
            triggered_by: row.get(3)?,
            status: row.get(4)?,
            rows_imported: row.get(5)?,
            rows_skipped: row.get(6)?,
            rows_errored: row.get(7)?,
            started_at: row.get(8)?,
            completed_at: row.get(9)?,
            error_message: row.get(10)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
