use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::models::DateOrder;
use crate::settings::db_path;

pub fn add(name: &str, date_order: &str) -> Result<()> {
    let order = DateOrder::from_str(date_order)
        .ok_or_else(|| TallyError::Other(format!("invalid date order '{date_order}' (use dmy or mdy)")))?;
    let conn = get_connection(&db_path())?;
    conn.execute(
        "INSERT INTO projects (name, date_order) VALUES (?1, ?2)",
        rusqlite::params![name, order.as_str()],
    )?;
    println!("Added project: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.date_order, count(t.id) \
         FROM projects p LEFT JOIN transactions t ON t.project_id = p.id \
         GROUP BY p.id ORDER BY p.name",
    )?;
    let rows: Vec<(i64, String, String, i64)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Date Order", "Transactions"]);
    for (id, name, order, txns) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(order),
            Cell::new(txns),
        ]);
    }
    println!("Projects\n{table}");
    Ok(())
}
