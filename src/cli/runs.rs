use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::runs::list_runs;
use crate::settings::db_path;

pub fn run(limit: usize) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let runs = list_runs(&conn, limit)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Source", "Name", "Trigger", "Status", "Imported", "Skipped", "Errored", "Started",
    ]);
    for r in runs {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.source_type),
            Cell::new(&r.source_name),
            Cell::new(&r.triggered_by),
            Cell::new(&r.status),
            Cell::new(r.rows_imported),
            Cell::new(r.rows_skipped),
            Cell::new(r.rows_errored),
            Cell::new(&r.started_at),
        ]);
    }
    println!("Import runs\n{table}");
    Ok(())
}
