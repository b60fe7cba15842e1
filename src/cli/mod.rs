pub mod import;
pub mod init;
pub mod projects;
pub mod reconcile;
pub mod runs;
pub mod status;
pub mod sync;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = "Financial operations console: ingest, dedup, reconcile.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up tally: choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage projects (legal entities).
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// Import a CSV/XLSX export into a project.
    Import {
        /// Path to CSV or XLSX file
        file: String,
        /// Project name to import into
        #[arg(long)]
        project: String,
        /// Force the input format: csv or xlsx (default: sniff the extension)
        #[arg(long)]
        format: Option<String>,
        /// Ambiguous-date order: dmy or mdy (default: the project's setting)
        #[arg(long = "date-order")]
        date_order: Option<String>,
        /// Column override, e.g. --map date=0 --map amount=3 (repeatable)
        #[arg(long = "map")]
        map: Vec<String>,
        /// Mark this run as scheduler-triggered
        #[arg(long)]
        cron: bool,
    },
    /// Ingest a platform client payload (JSON rows) into a project.
    Sync {
        /// Path to the JSON payload produced by the platform client
        file: String,
        /// Project name to import into
        #[arg(long)]
        project: String,
        /// Platform: stripe, paypal, or shopify
        #[arg(long)]
        platform: String,
        /// Mark this run as scheduler-triggered
        #[arg(long)]
        cron: bool,
    },
    /// Cross-source reconciliation: scan, review, confirm, reject.
    Reconcile {
        #[command(subcommand)]
        command: ReconcileCommands,
    },
    /// List recent import runs.
    Runs {
        /// How many runs to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ProjectsCommands {
    /// Add a new project.
    Add {
        /// Project name, e.g. 'Holdings LLC'
        name: String,
        /// Default order for ambiguous dates in this project's files: dmy or mdy
        #[arg(long = "date-order", default_value = "dmy")]
        date_order: String,
    },
    /// List all projects.
    List,
}

#[derive(Subcommand)]
pub enum ReconcileCommands {
    /// Scan a project for cross-source match candidates and store them as pending.
    Scan {
        /// Project name
        #[arg(long)]
        project: String,
    },
    /// List matches for a project.
    List {
        /// Project name
        #[arg(long)]
        project: String,
        /// Filter by status: pending, confirmed, rejected
        #[arg(long)]
        status: Option<String>,
    },
    /// Confirm a pending match.
    Confirm {
        /// Match ID (shown in `tally reconcile list`)
        id: i64,
    },
    /// Reject a pending match.
    Reject {
        /// Match ID (shown in `tally reconcile list`)
        id: i64,
    },
}
