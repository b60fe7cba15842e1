use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::models::MatchStatus;
use crate::normalize::to_cents;

/// Dates further apart than this never represent the same event.
const DATE_WINDOW_DAYS: i64 = 3;

/// Evidence recorded with every match so a reviewer can audit the rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub amount_equal: bool,
    pub date_diff_days: i64,
}

#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub tx_a: i64,
    pub tx_b: i64,
    pub confidence: f64,
    pub evidence: MatchEvidence,
}

/// A transaction's source bucket: the platform prefix of its external id,
/// or the platform name recorded as its source, else "manual".
pub fn source_label(external_id: Option<&str>, source_file: &str) -> &'static str {
    const PLATFORMS: [&str; 3] = ["stripe", "paypal", "shopify"];
    if let Some(id) = external_id {
        for p in PLATFORMS {
            if id.starts_with(p) && id[p.len()..].starts_with(':') {
                return p;
            }
        }
    }
    for p in PLATFORMS {
        if source_file == p {
            return p;
        }
    }
    "manual"
}

/// Exact amount is a precondition, so confidence is driven by date
/// proximity: 1.0 for same-day, minus 0.1 per day of drift.
fn confidence_for(date_diff_days: i64) -> f64 {
    1.0 - 0.1 * date_diff_days as f64
}

struct ScanRow {
    id: i64,
    date: NaiveDate,
    label: &'static str,
}

/// Scan one project's transactions for cross-source pairs that plausibly
/// record the same economic event: equal amount magnitude, dates within the
/// window, different source labels, and no prior match for the pair in any
/// status. Rows are bucketed by amount cents first, so the pairwise date
/// comparison only runs inside each bucket; output is identical to the naive
/// full pairwise scan.
pub fn find_candidates(conn: &Connection, project_id: i64) -> Result<Vec<MatchCandidate>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, amount, external_id, source_file FROM transactions \
         WHERE project_id = ?1",
    )?;
    let rows = stmt.query_map([project_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut buckets: HashMap<i64, Vec<ScanRow>> = HashMap::new();
    for row in rows {
        let (id, date, amount, external_id, source_file) = row?;
        let Ok(date) = NaiveDate::parse_from_str(&date, "%Y-%m-%d") else {
            continue;
        };
        let label = source_label(external_id.as_deref(), &source_file);
        buckets
            .entry(to_cents(amount))
            .or_default()
            .push(ScanRow { id, date, label });
    }

    let mut already_matched = HashSet::new();
    let mut stmt = conn.prepare("SELECT tx_a, tx_b FROM recon_matches")?;
    let pairs = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    for pair in pairs {
        already_matched.insert(pair?);
    }

    let mut candidates = Vec::new();
    for bucket in buckets.values() {
        for (i, a) in bucket.iter().enumerate() {
            for b in &bucket[i + 1..] {
                if a.label == b.label {
                    continue;
                }
                let date_diff = (a.date - b.date).num_days().abs();
                if date_diff > DATE_WINDOW_DAYS {
                    continue;
                }
                let (tx_a, tx_b) = (a.id.min(b.id), a.id.max(b.id));
                if already_matched.contains(&(tx_a, tx_b)) {
                    continue;
                }
                candidates.push(MatchCandidate {
                    tx_a,
                    tx_b,
                    confidence: confidence_for(date_diff),
                    evidence: MatchEvidence {
                        amount_equal: true,
                        date_diff_days: date_diff,
                    },
                });
            }
        }
    }
    candidates.sort_by_key(|c| (c.tx_a, c.tx_b));
    Ok(candidates)
}

/// Persist candidates as pending matches. The unordered-pair unique index
/// makes re-runs harmless; returns how many rows were actually created.
pub fn create_auto_matches(conn: &Connection, candidates: &[MatchCandidate]) -> Result<usize> {
    let mut created = 0;
    for c in candidates {
        let matched_on = serde_json::to_string(&c.evidence)
            .map_err(|e| TallyError::Other(e.to_string()))?;
        created += conn.execute(
            "INSERT OR IGNORE INTO recon_matches (tx_a, tx_b, confidence, matched_on, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                c.tx_a,
                c.tx_b,
                c.confidence,
                matched_on,
                MatchStatus::Pending.as_str(),
            ],
        )?;
    }
    Ok(created)
}

fn resolve(conn: &Connection, match_id: i64, to: MatchStatus) -> Result<()> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM recon_matches WHERE id = ?1",
            [match_id],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    match status.as_deref() {
        None => Err(TallyError::UnknownMatch(match_id)),
        Some("pending") => {
            conn.execute(
                "UPDATE recon_matches SET status = ?1, resolved_at = datetime('now') WHERE id = ?2",
                rusqlite::params![to.as_str(), match_id],
            )?;
            Ok(())
        }
        Some(terminal) => Err(TallyError::MatchResolved(match_id, terminal.to_string())),
    }
}

pub fn confirm(conn: &Connection, match_id: i64) -> Result<()> {
    resolve(conn, match_id, MatchStatus::Confirmed)
}

pub fn reject(conn: &Connection, match_id: i64) -> Result<()> {
    resolve(conn, match_id, MatchStatus::Rejected)
}

/// Flattened match row for the review listing.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct MatchRow {
    pub id: i64,
    pub status: String,
    pub confidence: f64,
    pub matched_on: String,
    pub date_a: String,
    pub date_b: String,
    pub description_a: String,
    pub description_b: String,
    pub amount: f64,
    pub label_a: String,
    pub label_b: String,
}

pub fn list_matches(
    conn: &Connection,
    project_id: i64,
    status: Option<&str>,
) -> Result<Vec<MatchRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.status, m.confidence, m.matched_on, \
                a.date, b.date, a.description, b.description, a.amount, \
                a.external_id, a.source_file, b.external_id, b.source_file \
         FROM recon_matches m \
         JOIN transactions a ON a.id = m.tx_a \
         JOIN transactions b ON b.id = m.tx_b \
         WHERE a.project_id = ?1 AND (?2 IS NULL OR m.status = ?2) \
         ORDER BY m.confidence DESC, m.id",
    )?;
    let rows = stmt.query_map(rusqlite::params![project_id, status], |row| {
        let ext_a: Option<String> = row.get(9)?;
        let file_a: String = row.get(10)?;
        let ext_b: Option<String> = row.get(11)?;
        let file_b: String = row.get(12)?;
        Ok(MatchRow {
            id: row.get(0)?,
            status: row.get(1)?,
            confidence: row.get(2)?,
            matched_on: row.get(3)?,
            date_a: row.get(4)?,
            date_b: row.get(5)?,
            description_a: row.get(6)?,
            description_b: row.get(7)?,
            amount: row.get(8)?,
            label_a: source_label(ext_a.as_deref(), &file_a).to_string(),
            label_b: source_label(ext_b.as_deref(), &file_b).to_string(),
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
