use std::path::PathBuf;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::ingest::import_file;
use crate::mapper::{CanonicalField, FieldKeywords};
use crate::models::DateOrder;
use crate::settings::{db_path, keywords_path};
use crate::tabular::FileFormat;

/// Parse a `--map field=index` override.
fn parse_override(raw: &str) -> Result<(CanonicalField, usize)> {
    let (field, index) = raw
        .split_once('=')
        .ok_or_else(|| TallyError::Other(format!("invalid --map '{raw}' (use field=index)")))?;
    let field = CanonicalField::from_str(field.trim())
        .ok_or_else(|| TallyError::Other(format!("unknown field '{field}' in --map")))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| TallyError::Other(format!("invalid column index in --map '{raw}'")))?;
    Ok((field, index))
}

pub fn run(
    file: &str,
    project: &str,
    format: Option<&str>,
    date_order: Option<&str>,
    map: &[String],
    cron: bool,
) -> Result<()> {
    let format = match format {
        Some(raw) => Some(FileFormat::from_str(raw).ok_or_else(|| {
            TallyError::Other(format!("invalid format '{raw}' (use csv or xlsx)"))
        })?),
        None => None,
    };
    let date_order = match date_order {
        Some(raw) => Some(DateOrder::from_str(raw).ok_or_else(|| {
            TallyError::Other(format!("invalid date order '{raw}' (use dmy or mdy)"))
        })?),
        None => None,
    };
    let mut overrides = Vec::new();
    for raw in map {
        overrides.push(parse_override(raw)?);
    }

    let conn = get_connection(&db_path())?;
    let keywords = FieldKeywords::load(&keywords_path());
    let triggered_by = if cron { "cron" } else { "manual" };

    let summary = import_file(
        &conn,
        &PathBuf::from(file),
        project,
        format,
        date_order,
        &overrides,
        &keywords,
        triggered_by,
    )?;

    for warning in &summary.warnings {
        println!("{} {warning}", "warning:".yellow());
    }
    println!(
        "{} imported, {} skipped, {} errored (run #{})",
        summary.imported, summary.skipped, summary.errored, summary.run_id
    );
    for reason in &summary.reasons {
        println!("  skipped {reason}");
    }
    Ok(())
}
