use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use estimator_data::{SeedOutcome, SubmissionSeeder};
use estimator_db_sqlite::SqliteSubmissionRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load sample estimate requests from a CSV file into the primary store.
///
/// Columns: full_name, email, phone, address, zip_code, property_type,
/// service_type, materials (`;`-separated), project_details. Empty optional
/// cells are stored as absent.
#[derive(Parser, Debug)]
#[command(name = "estimator-seed")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV of submissions to load
    #[arg(short, long)]
    file: PathBuf,

    /// Primary store: a `sqlite:` URL or a file path
    #[arg(short, long, default_value = "sqlite:estimates.db?mode=rwc")]
    database: String,

    /// Clear the store first, even when it already has rows
    #[arg(short, long)]
    replace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let store = SqliteSubmissionRepository::new(&args.database)
        .await
        .with_context(|| format!("Cannot open store: {}", args.database))?;
    store
        .run_migrations()
        .await
        .context("Cannot migrate store")?;

    let file = File::open(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;
    let records = SubmissionSeeder::parse(file)
        .with_context(|| format!("{} is not a valid submissions CSV", args.file.display()))?;
    info!(records = records.len(), file = %args.file.display(), "parsed seed file");

    match SubmissionSeeder::load(&store, &records, args.replace)
        .await
        .context("Seeding stopped")?
    {
        SeedOutcome::Skipped { existing } => {
            println!("{existing} submissions already stored; left untouched (use --replace to reseed).");
        }
        SeedOutcome::Loaded { removed, inserted } => {
            println!("Seeded {inserted} submissions ({removed} removed first).");
        }
    }

    Ok(())
}
