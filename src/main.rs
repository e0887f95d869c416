mod app;
mod domain;
mod infra;
mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::{run_compute, run_rates, unlock, AppError, ComputeOptions, SourceKind};

#[derive(Parser)]
#[command(
    name = "import-cost-estimator",
    version,
    about = "Estimate import landed cost, margins, and projected profit per product option."
)]
struct Cli {
    /// Front-door passphrase (or set IMPORT_COST_PASSPHRASE).
    #[arg(long, global = true, default_value = "")]
    passphrase: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute landed cost and margin for every quote row.
    Compute {
        /// JSON file with quote rows.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Use the built-in sample rows even when persisted rows exist.
        #[arg(long)]
        sample: bool,
        /// Write the result rows to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Rate source for the session.
        #[arg(long, value_enum, default_value = "remote")]
        source: SourceKind,
        /// Listing page URL for the scraped source.
        #[arg(long)]
        listing_url: Option<String>,
        /// Refresh rates even when the cache is fresh.
        #[arg(long)]
        refresh: bool,
        /// Do not persist the rows after the run.
        #[arg(long)]
        no_save: bool,
    },
    /// Show the session exchange rates.
    Rates {
        #[arg(long, value_enum, default_value = "remote")]
        source: SourceKind,
        #[arg(long)]
        listing_url: Option<String>,
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    if !unlock(&cli.passphrase) {
        return Err(AppError::AccessDenied);
    }

    match cli.command {
        Command::Compute {
            input,
            sample,
            csv,
            source,
            listing_url,
            refresh,
            no_save,
        } => {
            run_compute(ComputeOptions {
                input,
                sample,
                csv_out: csv,
                source,
                listing_url,
                refresh,
                no_save,
            })
            .await
        }
        Command::Rates {
            source,
            listing_url,
            refresh,
        } => run_rates(source, listing_url, refresh).await,
    }
}
