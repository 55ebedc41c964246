mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use timesheet_credentials::CredentialService;
use timesheet_storage::Database;
use timesheet_workers::{LoggingNotifier, WorkerCoordinator};

use config::Config;

#[derive(Parser)]
#[command(name = "timesheet")]
#[command(about = "Personal work-hour tracking core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and apply the schema if it does not exist.
    InitDb,
    /// Run the background workers (auto-shutdown, lunch reminder, expiry
    /// sweeper) until interrupted.
    RunWorkers,
    /// Issue a registration mnemonic and print it to stdout.
    IssueMnemonic,
    /// List registered users.
    Users,
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "External ID")]
    external_id: i64,
    #[tabled(rename = "Admin")]
    is_admin: bool,
    #[tabled(rename = "UTC offset (min)")]
    utc_offset_minutes: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let db = Arc::new(Database::new(Some(config.database_path.clone()))?);

    match cli.command {
        Commands::InitDb => {
            log::info!("database ready at {}", config.database_path.display());
        }
        Commands::RunWorkers => run_workers(db).await?,
        Commands::IssueMnemonic => issue_mnemonic(&db)?,
        Commands::Users => list_users(&db)?,
    }

    Ok(())
}

async fn run_workers(db: Arc<Database>) -> Result<()> {
    let notifier = Arc::new(LoggingNotifier);
    let coordinator = WorkerCoordinator::spawn(db, notifier);

    log::info!("workers running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    log::info!("received Ctrl-C, shutting down workers");
    coordinator.shutdown().await;
    Ok(())
}

fn issue_mnemonic(db: &Arc<Database>) -> Result<()> {
    let credentials = CredentialService::new(db.clone());
    let phrase = credentials.issue_registration_mnemonic(None)?;
    println!("{phrase}");
    Ok(())
}

fn list_users(db: &Database) -> Result<()> {
    let rows: Vec<UserRow> = db
        .all_users()?
        .into_iter()
        .map(|u| UserRow {
            external_id: u.external_id,
            is_admin: u.is_admin,
            utc_offset_minutes: u.utc_offset_minutes,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}
