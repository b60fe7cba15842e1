use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::CanonicalTransaction;
use crate::normalize::to_cents;

/// Backend query-size limit for `IN` existence checks.
const EXISTENCE_CHUNK: usize = 200;

#[derive(Debug, Default, PartialEq)]
pub struct DedupOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
}

/// Heuristic identity for rows without a stable external id. Two real
/// transactions sharing date, amount, truncated description, and source file
/// collapse to one — a documented limitation of manual/bank imports.
fn composite_key(date: &str, amount: f64, description: &str, source_file: &str) -> String {
    let desc: String = description.chars().take(50).collect();
    format!("{date}|{}|{desc}|{source_file}", to_cents(amount))
}

fn existing_external_ids(conn: &Connection, ids: &[&str]) -> Result<HashSet<String>> {
    let mut existing = HashSet::new();
    for chunk in ids.chunks(EXISTENCE_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            "SELECT external_id FROM transactions WHERE external_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
            row.get::<_, String>(0)
        })?;
        for row in rows {
            existing.insert(row?);
        }
    }
    Ok(existing)
}

fn existing_composite_keys(conn: &Connection, project_id: i64) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT date, amount, description, source_file FROM transactions \
         WHERE project_id = ?1 AND external_id IS NULL",
    )?;
    let rows = stmt.query_map([project_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, f64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    let mut keys = HashSet::new();
    for row in rows {
        let (date, amount, description, source_file) = row?;
        keys.insert(composite_key(&date, amount, &description, &source_file));
    }
    Ok(keys)
}

fn insert_tx(conn: &Connection, t: &CanonicalTransaction) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO transactions \
         (project_id, date, description, amount, tx_type, category, source_file, external_id, payment_source_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            t.project_id,
            t.date,
            t.description,
            t.amount,
            t.tx_type.as_str(),
            t.category,
            t.source_file,
            t.external_id,
            t.payment_source_id,
        ],
    )
}

// Only UNIQUE hits count as duplicates; other constraint failures (FK, CHECK)
// mean the row itself is bad and must surface as an error.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Filter out candidates that already exist, then insert the rest.
///
/// Candidates carrying an `external_id` are checked against the store in
/// chunked `IN` queries (the strong-identity path for API sources); the rest
/// fall back to the composite date/amount/description/source-file key scoped
/// to the project. Inserts run in one transaction; if that fails the batch
/// degrades to per-row inserts so one bad row never sinks the run. The
/// pre-check is an optimization only — the UNIQUE constraint on
/// `external_id` is the authoritative guard, and losing that race counts as
/// a skip, not an error.
pub fn dedupe_and_insert(
    conn: &Connection,
    candidates: &[CanonicalTransaction],
    project_id: i64,
) -> Result<DedupOutcome> {
    let mut outcome = DedupOutcome::default();
    if candidates.is_empty() {
        return Ok(outcome);
    }

    let keyed_ids: Vec<&str> = candidates
        .iter()
        .filter_map(|c| c.external_id.as_deref())
        .collect();
    let existing_ids = existing_external_ids(conn, &keyed_ids)?;
    let mut existing_keys = if candidates.iter().any(|c| c.external_id.is_none()) {
        existing_composite_keys(conn, project_id)?
    } else {
        HashSet::new()
    };

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut to_insert: Vec<&CanonicalTransaction> = Vec::new();
    for candidate in candidates {
        match candidate.external_id.as_deref() {
            Some(id) => {
                if existing_ids.contains(id) || !seen_ids.insert(id) {
                    outcome.skipped += 1;
                    continue;
                }
            }
            None => {
                let key = composite_key(
                    &candidate.date,
                    candidate.amount,
                    &candidate.description,
                    &candidate.source_file,
                );
                if !existing_keys.insert(key) {
                    outcome.skipped += 1;
                    continue;
                }
            }
        }
        to_insert.push(candidate);
    }

    // Bulk path first; partial progress is fine, so the fallback reruns every
    // row individually rather than trying to resume mid-batch.
    let tx = conn.unchecked_transaction()?;
    let mut bulk_failed = false;
    for candidate in &to_insert {
        if insert_tx(&tx, candidate).is_err() {
            bulk_failed = true;
            break;
        }
    }
    if !bulk_failed {
        tx.commit()?;
        outcome.imported = to_insert.len();
        return Ok(outcome);
    }
    drop(tx); // implicit rollback

    for candidate in to_insert {
        match insert_tx(conn, candidate) {
            Ok(_) => outcome.imported += 1,
            Err(e) if is_unique_violation(&e) => outcome.skipped += 1,
            Err(_) => outcome.errored += 1,
        }
    }
    Ok(outcome)
}
