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

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use dcse_calc_engine::{
    catalog::{Catalog, CatalogPreset},
    io::{catalog_to_toml, load_catalog_from_file},
};
use dcse_common::AppConfig;

pub fn run(command: CatalogCommand, app: &AppConfig) -> Result<()> {
    match command {
        CatalogCommand::Show(cmd) => cmd.execute(app),
        CatalogCommand::Check(cmd) => cmd.execute(),
    }
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Print a catalog preset (or the configured one) as TOML or JSON.
    Show(ShowCommand),
    /// Validate a catalog override file.
    Check(CheckCommand),
}

#[derive(Debug, Args)]
pub struct ShowCommand {
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

impl ShowCommand {
    fn execute(self, app: &AppConfig) -> Result<()> {
        let catalog = match self.preset {
            Some(preset) => CatalogPreset::from(preset).catalog(),
            None => app.engine.resolve_catalog(None)?,
        };
        println!("{}", render(&catalog, self.json)?);
        Ok(())
    }
}

impl CheckCommand {
    fn execute(self) -> Result<()> {
        let catalog = load_catalog_from_file(&self.file)
            .with_context(|| format!("catalog {} is invalid", self.file.display()))?;
        println!("Catalog '{}' is valid", catalog.name);
        Ok(())
    }
}

fn render(catalog: &Catalog, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(catalog).context("failed to serialise catalog")
    } else {
        catalog_to_toml(catalog).context("failed to serialise catalog")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PresetArg {
    Standard,
    MarketRecalibrated,
}

impl From<PresetArg> for CatalogPreset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Standard => CatalogPreset::Standard,
            PresetArg::MarketRecalibrated => CatalogPreset::MarketRecalibrated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_rendering_reloads_as_same_catalog() {
        let catalog = Catalog::market_recalibrated();
        let rendered = render(&catalog, false).unwrap();
        let parsed: Catalog = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, catalog);
    }
}
