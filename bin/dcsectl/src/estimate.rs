//! ---
//! dcse_section: "05-external-interfaces"
//! dcse_subsection: "binary"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Control CLI for operators producing study estimates."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use dcse_calc_engine::{
    catalog::BoundsPolicy,
    estimate_with_policy,
    io::load_configuration_from_file,
    model::{CalculationMode, ProjectConfiguration},
    reports::ExportRecord,
    Estimate, FactorKind,
};
use dcse_common::AppConfig;
use dcse_config::active_calibration;
use dcse_logging::{
    dcse_debug, dcse_error, dcse_info, dcse_warn, log_system_event, LogContext, SystemEventOutcome,
};

#[derive(Debug, Args)]
pub struct EstimateCommand {
    /// Project request (JSON or YAML).
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// TOML catalog replacing the configured preset.
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Reject active pricing factors outside their documented bounds.
    #[arg(long = "strict-bounds", action = clap::ArgAction::SetTrue)]
    strict_bounds: bool,

    /// Ignore the active calibration profile.
    #[arg(long = "no-calibration", action = clap::ArgAction::SetTrue)]
    no_calibration: bool,

    /// Print the estimate as JSON instead of a text breakdown.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    /// Append the flat export record to this CSV file.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Append the export record to the configured CSV file.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "csv")]
    export: bool,

    /// Write an `estimate.json` report envelope into this directory.
    #[arg(long = "report-dir", value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

impl EstimateCommand {
    pub fn execute(self, app: &AppConfig) -> Result<()> {
        let request = load_configuration_from_file(&self.input)
            .with_context(|| format!("failed to load request {}", self.input.display()))?;
        let catalog = app.engine.resolve_catalog(self.catalog.as_deref())?;
        let calibration = if self.no_calibration {
            Default::default()
        } else {
            active_calibration(&app.calibration.profile_root)?
        };
        let policy = if self.strict_bounds {
            BoundsPolicy::Strict
        } else {
            app.engine.bounds_policy
        };

        let mode = match request.calculation_mode {
            CalculationMode::Consolidated => "consolidated",
            CalculationMode::PhaseWise => "phase_wise",
        };
        let project = self.input.display().to_string();
        let ctx = LogContext::new().with_project(&project).with_mode(mode);
        if request.ensure_selection().is_err() {
            dcse_warn!(context = ctx.clone(), "no studies selected");
        }

        let estimate = match estimate_with_policy(&request, &catalog, &calibration, policy) {
            Ok(estimate) => estimate,
            Err(error) => {
                log_system_event(
                    Some(&ctx),
                    "estimate.run",
                    &format!("estimate failed: {error}"),
                    SystemEventOutcome::Fault,
                );
                return Err(error.into());
            }
        };
        dcse_info!(
            context = ctx.clone(),
            "estimate complete: standard {:.2}, competitive {:.2}",
            estimate.summary.standard_cost,
            estimate.summary.competitive_cost
        );
        log_breakdown(&ctx, &estimate);

        let timestamp = Utc::now();
        let csv_path = match (&self.csv, self.export) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(app.csv_path()),
            (None, false) => None,
        };
        if let Some(path) = csv_path {
            ExportRecord::project(&estimate, &request, timestamp)
                .append_csv(&path)
                .with_context(|| format!("failed to append export record to {}", path.display()))?;
            log_system_event(
                Some(&ctx),
                "estimate.export",
                &format!("record appended to {}", path.display()),
                SystemEventOutcome::Success,
            );
        }
        if let Some(dir) = &self.report_dir {
            if let Err(error) = estimate.exporter().export_all(dir, timestamp) {
                dcse_error!(
                    context = ctx.clone(),
                    "report export to {} failed: {}",
                    dir.display(),
                    error
                );
                return Err(anyhow::Error::new(error)
                    .context(format!("failed to write report to {}", dir.display())));
            }
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&estimate).context("failed to serialise estimate")?
            );
        } else {
            print!("{}", render(&estimate, &request));
        }
        Ok(())
    }
}

/// One debug event per costed study, tagged with its phase when phase-wise.
fn log_breakdown(ctx: &LogContext<'_>, estimate: &Estimate) {
    for study in &estimate.studies {
        let key = study.kind.to_string();
        dcse_debug!(
            context = ctx.clone().with_study(&key),
            "{:.2} h on {} buses, total {:.2}",
            study.hours,
            study.buses,
            study.total_cost
        );
    }
    for phase in &estimate.phases {
        let phase_ctx = ctx.clone().with_phase(&phase.name);
        dcse_info!(
            context = phase_ctx.clone(),
            "{:.2} MW on {} buses, total {:.2}",
            phase.capacity_mw,
            phase.buses,
            phase.total_cost
        );
        for study in &phase.studies {
            let key = study.kind.to_string();
            dcse_debug!(
                context = phase_ctx.clone().with_study(&key),
                "{:.2} h, total {:.2}",
                study.hours,
                study.total_cost
            );
        }
    }
}

fn render(estimate: &Estimate, request: &ProjectConfiguration) -> String {
    let summary = &estimate.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Catalog:        {}", estimate.catalog);
    let _ = writeln!(
        out,
        "Total load:     {:.2} MW ({})",
        estimate.total_load_mw, request.tier
    );
    let _ = writeln!(
        out,
        "Bus count:      {}{}",
        estimate.buses.value,
        if estimate.buses.is_override() {
            " (override)"
        } else {
            ""
        }
    );

    for study in &estimate.studies {
        let _ = writeln!(
            out,
            "  {:<36} {:>8.2} h  labor {:>12.2}  report {:>10.2}  total {:>12.2}",
            study.name, study.hours, study.labor_cost, study.report_cost, study.total_cost
        );
    }
    for phase in &estimate.phases {
        let _ = writeln!(
            out,
            "  {} ({:.2} MW, {} buses): {:.2} h, {:.2}",
            phase.name, phase.capacity_mw, phase.buses, phase.total_hours, phase.total_cost
        );
        for study in &phase.studies {
            let _ = writeln!(
                out,
                "    {:<34} {:>8.2} h  total {:>12.2}",
                study.name, study.hours, study.total_cost
            );
        }
    }

    let _ = writeln!(out, "Total hours:    {:.2}", estimate.total_hours);
    if summary.additional_total > 0.0 {
        let _ = writeln!(out, "Additional:     {:.2}", summary.additional_total);
    }
    let _ = writeln!(out, "Standard cost:  {:.2}", summary.standard_cost);
    let _ = writeln!(
        out,
        "Competitive:    {:.2} (x{:.4})",
        summary.competitive_cost, summary.competitive_multiplier
    );
    let _ = writeln!(
        out,
        "Savings:        {:.2} ({:.2}%)",
        summary.savings, summary.savings_percentage
    );

    let reductions: Vec<String> = estimate
        .applied_factors
        .iter()
        .filter(|factor| factor.kind != FactorKind::Informational)
        .map(|factor| format!("{} x{:.2}", factor.label, factor.factor))
        .collect();
    if !reductions.is_empty() {
        let _ = writeln!(out, "Factors:        {}", reductions.join(", "));
    }
    out
}
