#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for loading address data.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use openpaq_database::{import_si_addresses, paths};

#[derive(Parser)]
#[command(name = "openpaq_import", about = "openPAQ address data import tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the Slovenian address register CSV (`RN_SLO_NASLOVI`) into the
    /// database read by the Slovenian matcher
    Si {
        /// Path of the register CSV export
        csv: PathBuf,
        /// Database file to write (default: `data/si_addresses.duckdb`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Si { csv, db } => {
            let db = db.unwrap_or_else(paths::si_addresses_db_path);
            let start = Instant::now();

            let stats = import_si_addresses(&csv, &db)?;

            log::info!(
                "Wrote {} addresses to {} in {:.1}s",
                stats.addresses,
                db.display(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
