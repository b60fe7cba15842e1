use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::{get_connection, get_project};
use crate::error::Result;
use crate::recon::{confirm, create_auto_matches, find_candidates, list_matches, reject};
use crate::settings::db_path;

pub fn scan(project: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = get_project(&conn, project)?;
    let candidates = find_candidates(&conn, project.id)?;
    let created = create_auto_matches(&conn, &candidates)?;
    println!(
        "{} candidate pair(s) found, {} new pending match(es) created",
        candidates.len(),
        created
    );
    if created > 0 {
        println!("Review them with `tally reconcile list --project '{}'`", project.name);
    }
    Ok(())
}

pub fn list(project: &str, status: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let project = get_project(&conn, project)?;
    let rows = list_matches(&conn, project.id, status)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Status", "Conf.", "Amount", "A", "B", "Evidence",
    ]);
    for m in rows {
        table.add_row(vec![
            Cell::new(m.id),
            Cell::new(&m.status),
            Cell::new(format!("{:.2}", m.confidence)),
            Cell::new(format!("{:.2}", m.amount)),
            Cell::new(format!("{} {} ({})", m.date_a, m.description_a, m.label_a)),
            Cell::new(format!("{} {} ({})", m.date_b, m.description_b, m.label_b)),
            Cell::new(&m.matched_on),
        ]);
    }
    println!("Matches\n{table}");
    Ok(())
}

pub fn confirm_match(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    confirm(&conn, id)?;
    println!("{} match {id}", "Confirmed".green());
    Ok(())
}

pub fn reject_match(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    reject(&conn, id)?;
    println!("{} match {id}", "Rejected".red());
    Ok(())
}
