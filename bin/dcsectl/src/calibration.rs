//! ---
//! dcse_section: "05-external-interfaces"
//! dcse_subsection: "binary"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Control CLI for operators producing study estimates."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use dcse_calc_engine::{calibration::CalibrationSnapshot, catalog::StudyKind};
use dcse_common::AppConfig;
use dcse_config::{load_active_profile, reset_active_profile, CalibrationManifest};
use dcse_logging::{log_system_event, SystemEventOutcome};

pub fn run(command: CalibrationCommand, app: &AppConfig) -> Result<()> {
    match command {
        CalibrationCommand::Show(opts) => show(&opts.root(app)),
        CalibrationCommand::Set(cmd) => cmd.execute(app),
        CalibrationCommand::Reset(opts) => reset(&opts.root(app)),
    }
}

#[derive(Debug, Subcommand)]
pub enum CalibrationCommand {
    /// Print the active calibration profile.
    Show(RootOptions),
    /// Store a calibration profile and make it active.
    Set(SetCommand),
    /// Clear the active profile so estimates run uncalibrated.
    Reset(RootOptions),
}

#[derive(Debug, Args)]
pub struct RootOptions {
    /// Profile root directory (defaults to `calibration.profile_root`).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

impl RootOptions {
    fn root(&self, app: &AppConfig) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| app.calibration.profile_root.clone())
    }
}

#[derive(Debug, Args)]
pub struct SetCommand {
    /// Profile name.
    #[arg(long, value_name = "NAME")]
    name: String,

    /// Factor applied to every study.
    #[arg(long, default_value_t = 1.0)]
    global: f64,

    /// Per-study factor as STUDY=FACTOR (e.g. arc_flash=0.9).
    #[arg(long = "study", value_name = "STUDY=FACTOR")]
    studies: Vec<String>,

    #[command(flatten)]
    root: RootOptions,
}

impl SetCommand {
    fn execute(self, app: &AppConfig) -> Result<()> {
        let mut snapshot = CalibrationSnapshot::identity().with_global(self.global);
        for spec in &self.studies {
            let (kind, factor) = parse_study_factor(spec)?;
            snapshot = snapshot.with_study(kind, factor);
        }

        let root = self.root.root(app);
        let manifest = CalibrationManifest::new(&self.name, snapshot)?;
        let persisted = match manifest.persist(&root) {
            Ok(persisted) => persisted,
            Err(error) => {
                log_system_event(
                    None,
                    "calibration.persist",
                    &format!("failed to persist calibration profile: {error}"),
                    SystemEventOutcome::Fault,
                );
                return Err(error);
            }
        };
        log_system_event(
            None,
            "calibration.persist",
            &format!(
                "profile '{}' saved to {}",
                persisted.manifest.profile.name,
                persisted.manifest_path.display()
            ),
            SystemEventOutcome::Success,
        );

        println!(
            "Calibration profile '{}' persisted to {}",
            persisted.manifest.profile.name,
            persisted.manifest_path.display()
        );
        println!("Calibration hash: {}", persisted.calibration_hash());
        Ok(())
    }
}

fn show(root: &Path) -> Result<()> {
    match load_active_profile(root)? {
        Some(manifest) => {
            println!(
                "Active profile: {} ({})",
                manifest.profile.name, manifest.profile.calibration_hash
            );
            println!(
                "{}",
                toml::to_string_pretty(&manifest.calibration)
                    .context("failed to serialise calibration")?
            );
        }
        None => println!("No active calibration profile; estimates run uncalibrated."),
    }
    Ok(())
}

fn reset(root: &Path) -> Result<()> {
    if reset_active_profile(root)? {
        log_system_event(
            None,
            "calibration.reset",
            "active calibration profile cleared",
            SystemEventOutcome::Success,
        );
        println!("Calibration reset to identity.");
    } else {
        log_system_event(
            None,
            "calibration.reset",
            "no active calibration profile to clear",
            SystemEventOutcome::Skipped,
        );
        println!("No active calibration profile.");
    }
    Ok(())
}

fn parse_study_factor(spec: &str) -> Result<(StudyKind, f64)> {
    let (key, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("study factor '{}' must be STUDY=FACTOR", spec))?;
    let kind: StudyKind = serde_json::from_value(serde_json::Value::String(key.trim().to_owned()))
        .map_err(|_| anyhow!("unknown study '{}'", key.trim()))?;
    let factor = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid factor in '{}'", spec))?;
    Ok((kind, factor))
}
