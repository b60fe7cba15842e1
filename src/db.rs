use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, TallyError};
use crate::models::{DateOrder, Project};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    date_order TEXT NOT NULL DEFAULT 'dmy',
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS payment_sources (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    tx_type TEXT NOT NULL,
    category TEXT,
    source_file TEXT NOT NULL,
    external_id TEXT UNIQUE,
    payment_source_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id),
    FOREIGN KEY (payment_source_id) REFERENCES payment_sources(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_project ON transactions(project_id);

CREATE TABLE IF NOT EXISTS import_runs (
    id INTEGER PRIMARY KEY,
    source_type TEXT NOT NULL,
    source_name TEXT NOT NULL,
    triggered_by TEXT NOT NULL DEFAULT 'manual',
    status TEXT NOT NULL DEFAULT 'running',
    rows_imported INTEGER DEFAULT 0,
    rows_skipped INTEGER DEFAULT 0,
    rows_errored INTEGER DEFAULT 0,
    started_at TEXT DEFAULT (datetime('now')),
    completed_at TEXT,
    error_message TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS recon_matches (
    id INTEGER PRIMARY KEY,
    tx_a INTEGER NOT NULL,
    tx_b INTEGER NOT NULL,
    confidence REAL NOT NULL,
    matched_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT DEFAULT (datetime('now')),
    resolved_at TEXT,
    UNIQUE (tx_a, tx_b),
    FOREIGN KEY (tx_a) REFERENCES transactions(id),
    FOREIGN KEY (tx_b) REFERENCES transactions(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn get_project(conn: &Connection, name: &str) -> Result<Project> {
    let mut stmt = conn.prepare("SELECT id, name, date_order FROM projects WHERE name = ?1")?;
    let row = stmt
        .query_row([name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|_| TallyError::UnknownProject(name.to_string()))?;
    Ok(Project {
        id: row.0,
        name: row.1,
        date_order: DateOrder::from_str(&row.2).unwrap_or(DateOrder::DayFirst),
    })
}
