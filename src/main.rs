mod builder;
mod cli;
mod db;
mod dedup;
mod error;
mod ingest;
mod mapper;
mod models;
mod normalize;
mod recon;
mod runs;
mod settings;
mod tabular;

use clap::Parser;

use cli::{Cli, Commands, ProjectsCommands, ReconcileCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Projects { command } => match command {
            ProjectsCommands::Add { name, date_order } => cli::projects::add(&name, &date_order),
            ProjectsCommands::List => cli::projects::list(),
        },
        Commands::Import {
            file,
            project,
            format,
            date_order,
            map,
            cron,
        } => cli::import::run(
            &file,
            &project,
            format.as_deref(),
            date_order.as_deref(),
            &map,
            cron,
        ),
        Commands::Sync {
            file,
            project,
            platform,
            cron,
        } => cli::sync::run(&file, &project, &platform, cron),
        Commands::Reconcile { command } => match command {
            ReconcileCommands::Scan { project } => cli::reconcile::scan(&project),
            ReconcileCommands::List { project, status } => {
                cli::reconcile::list(&project, status.as_deref())
            }
            ReconcileCommands::Confirm { id } => cli::reconcile::confirm_match(id),
            ReconcileCommands::Reject { id } => cli::reconcile::reject_match(id),
        },
        Commands::Runs { limit } => cli::runs::run(limit),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
