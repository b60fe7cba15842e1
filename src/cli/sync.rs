use std::path::PathBuf;

use crate::db::get_connection;
use crate::error::Result;
use crate::ingest::sync_platform;
use crate::settings::db_path;

/// API syncs get the aggregate-only summary; per-row reasons are a manual
/// import affordance.
pub fn run(file: &str, project: &str, platform: &str, cron: bool) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let triggered_by = if cron { "cron" } else { "manual" };
    let summary = sync_platform(&conn, &PathBuf::from(file), project, platform, triggered_by)?;
    println!(
        "{platform}: {} imported, {} skipped, {} errored (run #{})",
        summary.imported, summary.skipped, summary.errored, summary.run_id
    );
    Ok(())
}
