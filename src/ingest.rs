use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::builder::{build_rows, build_source_rows, RowContext};
use crate::db::get_project;
use crate::dedup::dedupe_and_insert;
use crate::error::{Result, TallyError};
use crate::mapper::{auto_map, CanonicalField, FieldKeywords};
use crate::models::{DateOrder, SourceRow};
use crate::runs::{self, RunOutcome};
use crate::tabular::{self, FileFormat};

pub const PLATFORMS: &[&str] = &["stripe", "paypal", "shopify"];

#[derive(Debug)]
pub struct ImportSummary {
    pub run_id: i64,
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
    /// The exact file bytes were already ingested by an earlier run. Dedup
    /// governs either way; this only drives a heads-up in the summary.
    pub duplicate_file: bool,
    pub warnings: Vec<String>,
    pub reasons: Vec<String>,
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Complete the run as failed and hand the error back to the caller.
/// Nothing has been persisted at any point this is reachable from.
fn fail_run(conn: &Connection, run_id: i64, err: TallyError) -> TallyError {
    let _ = runs::complete(
        conn,
        run_id,
        &RunOutcome {
            error_message: Some(err.to_string()),
            ..Default::default()
        },
    );
    err
}

/// Manual CSV/XLSX ingestion: parse, auto-map (plus overrides), build,
/// dedup, insert, and record the run. Row-level problems never abort; the
/// summary carries a per-row reason log for the reviewer.
pub fn import_file(
    conn: &Connection,
    path: &Path,
    project_name: &str,
    format: Option<FileFormat>,
    date_order: Option<DateOrder>,
    overrides: &[(CanonicalField, usize)],
    keywords: &FieldKeywords,
    triggered_by: &str,
) -> Result<ImportSummary> {
    let project = get_project(conn, project_name)?;
    let source_name = file_name(path);
    let checksum = compute_checksum(path)?;

    let format = format.or_else(|| tabular::sniff_format(path));
    let source_type = format.map(|f| f.as_str()).unwrap_or("unknown");

    let run_id = runs::start(conn, source_type, &source_name, triggered_by, Some(&checksum))?;

    let mut warnings = Vec::new();
    let duplicate_file = runs::checksum_seen(conn, &source_name, &checksum)?;
    if duplicate_file {
        warnings.push("this exact file was already imported; duplicates will be skipped".to_string());
    }

    let table = match tabular::parse_path(path, format) {
        Ok(t) => t,
        Err(e) => return Err(fail_run(conn, run_id, e)),
    };

    let mut mapping = auto_map(&table.headers, keywords);
    for &(field, index) in overrides {
        mapping.set(field, index);
    }
    warnings.extend(mapping.warnings());

    let ctx = RowContext {
        project_id: project.id,
        source_file: &source_name,
        date_order: date_order.unwrap_or(project.date_order),
        payment_source_id: None,
    };
    let built = build_rows(&table, &mapping, &ctx);

    let dedup = match dedupe_and_insert(conn, &built.candidates, project.id) {
        Ok(d) => d,
        Err(e) => return Err(fail_run(conn, run_id, e)),
    };

    let outcome = RunOutcome {
        imported: dedup.imported,
        skipped: built.skipped + dedup.skipped,
        errored: dedup.errored,
        error_message: None,
    };
    runs::complete(conn, run_id, &outcome)?;

    Ok(ImportSummary {
        run_id,
        imported: outcome.imported,
        skipped: outcome.skipped,
        errored: outcome.errored,
        duplicate_file,
        warnings,
        reasons: built.reasons,
    })
}

/// Platform sync ingestion: a JSON array of `SourceRow`s, as produced by the
/// Stripe/PayPal/Shopify clients, flows through the same build/dedup/run
/// pipeline on the strong-identity (external id) path.
pub fn sync_platform(
    conn: &Connection,
    path: &Path,
    project_name: &str,
    platform: &str,
    triggered_by: &str,
) -> Result<ImportSummary> {
    if !PLATFORMS.contains(&platform) {
        return Err(TallyError::UnknownPlatform(platform.to_string()));
    }
    let project = get_project(conn, project_name)?;
    let source_name = file_name(path);

    let run_id = runs::start(conn, platform, &source_name, triggered_by, None)?;

    let rows: Vec<SourceRow> = match std::fs::read_to_string(path)
        .map_err(TallyError::from)
        .and_then(|content| {
            serde_json::from_str(&content).map_err(|e| TallyError::Payload(e.to_string()))
        }) {
        Ok(rows) => rows,
        Err(e) => return Err(fail_run(conn, run_id, e)),
    };

    // Platform payloads carry ISO or unambiguous dates; month-first covers
    // the US-formatted stragglers.
    let built = build_source_rows(&rows, platform, project.id, DateOrder::MonthFirst);

    let dedup = match dedupe_and_insert(conn, &built.candidates, project.id) {
        Ok(d) => d,
        Err(e) => return Err(fail_run(conn, run_id, e)),
    };

    let outcome = RunOutcome {
        imported: dedup.imported,
        skipped: built.skipped + dedup.skipped,
        errored: dedup.errored,
        error_message: None,
    };
    runs::complete(conn, run_id, &outcome)?;

    Ok(ImportSummary {
        run_id,
        imported: outcome.imported,
        skipped: outcome.skipped,
        errored: outcome.errored,
        duplicate_file: false,
        warnings: Vec::new(),
        reasons: built.reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute("INSERT INTO projects (name) VALUES ('Acme')", []).unwrap();
        (dir, conn)
    }

    fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const BANK_CSV: &str = "\
Date,Description,Amount
15/03/2024,Client payment,1500.00
16/03/2024,Office rent,-800.00
17/03/2024,Refund adjustment,0.00
";

    #[test]
    fn test_import_is_idempotent() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", BANK_CSV);

        let first =
            import_file(&conn, &path, "Acme", None, None, &[], &FieldKeywords::default(), "manual")
                .unwrap();
        assert_eq!(first.imported, 2);
        assert_eq!(first.skipped, 1); // the zero-amount row
        assert_eq!(first.errored, 0);
        assert!(!first.duplicate_file);

        let second =
            import_file(&conn, &path, "Acme", None, None, &[], &FieldKeywords::default(), "manual")
                .unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 3); // 2 dedup hits + zero-amount row
        assert!(second.duplicate_file);

        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_import_records_run_with_reasons() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", BANK_CSV);
        let summary =
            import_file(&conn, &path, "Acme", None, None, &[], &FieldKeywords::default(), "manual")
                .unwrap();
        assert_eq!(summary.reasons.len(), 1);
        assert!(summary.reasons[0].contains("zero amount"));

        let (status, imported): (String, i64) = conn
            .query_row(
                "SELECT status, rows_imported FROM import_runs WHERE id = ?1",
                [summary.run_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "completed");
        assert_eq!(imported, 2);
    }

    #[test]
    fn test_import_empty_file_fails_run() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "empty.csv", "Date,Description,Amount\n");
        let err = import_file(&conn, &path, "Acme", None, None, &[], &FieldKeywords::default(), "manual");
        assert!(matches!(err, Err(TallyError::NoDataRows)));

        let (status, msg): (String, Option<String>) = conn
            .query_row(
                "SELECT status, error_message FROM import_runs ORDER BY id DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "failed");
        assert!(msg.unwrap().contains("No data rows"));
        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_import_unknown_project_before_run() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.csv", BANK_CSV);
        let err = import_file(&conn, &path, "Nope", None, None, &[], &FieldKeywords::default(), "manual");
        assert!(matches!(err, Err(TallyError::UnknownProject(_))));
        let runs: i64 = conn
            .query_row("SELECT count(*) FROM import_runs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_import_mapping_override() {
        let (dir, conn) = test_db();
        // Headers the auto-mapper cannot place.
        let path = write_csv(
            dir.path(),
            "odd.csv",
            "When,What,How Much\n15/03/2024,Consulting,250.00\n",
        );
        let overrides = [
            (CanonicalField::Date, 0),
            (CanonicalField::Description, 1),
            (CanonicalField::Amount, 2),
        ];
        let summary = import_file(
            &conn,
            &path,
            "Acme",
            None,
            None,
            &overrides,
            &FieldKeywords::default(),
            "manual",
        )
        .unwrap();
        assert_eq!(summary.imported, 1);
    }

    #[test]
    fn test_import_declared_format_for_odd_extension() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "stmt.dat", BANK_CSV);

        let err = import_file(&conn, &path, "Acme", None, None, &[], &FieldKeywords::default(), "manual");
        assert!(matches!(err, Err(TallyError::UnknownFormat(_))));

        let summary = import_file(
            &conn,
            &path,
            "Acme",
            Some(FileFormat::Csv),
            None,
            &[],
            &FieldKeywords::default(),
            "manual",
        )
        .unwrap();
        assert_eq!(summary.imported, 2);

        let source_type: String = conn
            .query_row(
                "SELECT source_type FROM import_runs WHERE id = ?1",
                [summary.run_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(source_type, "csv");
    }

    #[test]
    fn test_sync_platform_idempotent() {
        let (dir, conn) = test_db();
        let payload = r#"[
            {"id": "tx_1", "date": "2024-03-15", "description": "Payout", "amount": "250.00"},
            {"id": "tx_2", "date": "2024-03-16", "description": "Payout", "amount": "90.00"}
        ]"#;
        let path = write_csv(dir.path(), "stripe.json", payload);

        let first = sync_platform(&conn, &path, "Acme", "stripe", "cron").unwrap();
        assert_eq!(first.imported, 2);
        let second = sync_platform(&conn, &path, "Acme", "stripe", "cron").unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 2);

        let ids: Vec<String> = conn
            .prepare("SELECT external_id FROM transactions ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec!["stripe:tx_1", "stripe:tx_2"]);
    }

    #[test]
    fn test_sync_rejects_unknown_platform() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "x.json", "[]");
        assert!(matches!(
            sync_platform(&conn, &path, "Acme", "venmo", "manual"),
            Err(TallyError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn test_sync_bad_payload_fails_run() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "x.json", "{not json");
        assert!(matches!(
            sync_platform(&conn, &path, "Acme", "stripe", "manual"),
            Err(TallyError::Payload(_))
        ));
        let status: String = conn
            .query_row("SELECT status FROM import_runs ORDER BY id DESC LIMIT 1", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(status, "failed");
    }
}
