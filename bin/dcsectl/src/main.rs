//! ---
//! dcse_section: "05-external-interfaces"
//! dcse_subsection: "binary"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Control CLI for operators producing study estimates."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dcse_common::{init_tracing, AppConfig};
use dcse_logging as logging;

mod calibration;
mod catalog;
mod estimate;

const CONFIG_CANDIDATES: [&str; 2] = ["configs/dcse.toml", "/etc/dcse/dcse.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Data-center power-system study estimator",
    long_about = None
)]
struct Cli {
    /// Configuration file (otherwise DCSE_CONFIG or the default locations).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price a project request.
    Estimate(estimate::EstimateCommand),
    #[command(subcommand, about = "Inspect constant catalogs")]
    Catalog(catalog::CatalogCommand),
    #[command(subcommand, about = "Manage calibration profiles")]
    Calibration(calibration::CalibrationCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = match &cli.config {
        Some(path) => (AppConfig::from_path(path)?, true),
        None => {
            let loaded = AppConfig::load_with_source(&CONFIG_CANDIDATES)?;
            let from_file = loaded.source.is_some();
            (loaded.config, from_file)
        }
    };
    if from_file {
        init_tracing("dcsectl", &config.logging)?;
    } else {
        logging::init();
    }

    match cli.command {
        Commands::Estimate(cmd) => cmd.execute(&config)?,
        Commands::Catalog(cmd) => catalog::run(cmd, &config)?,
        Commands::Calibration(cmd) => calibration::run(cmd, &config)?,
    }
    Ok(())
}
