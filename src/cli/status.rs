use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("tally.db");

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let projects: i64 = conn.query_row("SELECT count(*) FROM projects", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let runs: i64 = conn.query_row("SELECT count(*) FROM import_runs", [], |r| r.get(0))?;
        let pending: i64 = conn.query_row(
            "SELECT count(*) FROM recon_matches WHERE status = 'pending'",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Projects:         {projects}");
        println!("Transactions:     {transactions}");
        println!("Import runs:      {runs}");
        println!("Pending matches:  {pending}");
    } else {
        println!();
        println!("Database not found. Run `tally init` to set up.");
    }

    Ok(())
}
