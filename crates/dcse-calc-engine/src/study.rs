//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    allocation::{allocate, LaborRates, LevelHours, ResourceSplit},
    calibration::CalibrationSnapshot,
    catalog::{Catalog, StudyDefinition, StudyKind},
    errors::{ensure_non_negative, Result},
};

/// Effort multipliers applied to `buses × base_hours_per_bus`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudyMultipliers {
    pub tier_complexity: f64,
    pub delivery: f64,
    pub topology: f64,
    pub modeling_factor: f64,
    pub calibration_factor: f64,
}

impl Default for StudyMultipliers {
    fn default() -> Self {
        Self {
            tier_complexity: 1.0,
            delivery: 1.0,
            topology: 1.0,
            modeling_factor: 1.0,
            calibration_factor: 1.0,
        }
    }
}

impl StudyMultipliers {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("multipliers.tier_complexity", self.tier_complexity)?;
        ensure_non_negative("multipliers.delivery", self.delivery)?;
        ensure_non_negative("multipliers.topology", self.topology)?;
        ensure_non_negative("multipliers.modeling_factor", self.modeling_factor)?;
        ensure_non_negative("multipliers.calibration_factor", self.calibration_factor)
    }

    /// Combined effort multiplier. Order of the factors does not matter.
    pub fn product(&self) -> f64 {
        [
            self.tier_complexity,
            self.delivery,
            self.topology,
            self.modeling_factor,
            self.calibration_factor,
        ]
        .iter()
        .product()
    }

    pub fn with_calibration(mut self, calibration_factor: f64) -> Self {
        self.calibration_factor = calibration_factor;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub format_multiplier: f64,
    pub complexity_factor: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format_multiplier: 1.0,
            complexity_factor: 1.0,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("report.format_multiplier", self.format_multiplier)?;
        ensure_non_negative("report.complexity_factor", self.complexity_factor)
    }

    pub fn report_cost(&self, base_report_price: f64) -> f64 {
        base_report_price * self.format_multiplier * self.complexity_factor
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    pub kind: StudyKind,
    pub name: String,
    pub complexity: String,
    pub buses: u32,
    pub hours: f64,
    pub level_hours: LevelHours,
    pub labor_cost: f64,
    pub report_cost: f64,
    pub total_cost: f64,
}

/// Cost one study against a bus count.
pub fn compute_study(
    kind: StudyKind,
    study: &StudyDefinition,
    buses: u32,
    multipliers: &StudyMultipliers,
    split: &ResourceSplit,
    rates: &LaborRates,
    report: &ReportConfig,
) -> Result<StudyResult> {
    multipliers.validate()?;
    rates.validate()?;
    report.validate()?;

    let hours = f64::from(buses) * study.base_hours_per_bus * multipliers.product();
    let level_hours = allocate(hours, split)?;
    let labor_cost = rates.labor_cost(&level_hours);
    let report_cost = report.report_cost(study.base_report_price);
    let total_cost = labor_cost + report_cost;

    debug!(study = %kind, buses, hours, labor_cost, report_cost, "study costed");

    Ok(StudyResult {
        kind,
        name: study.name.clone(),
        complexity: study.complexity.clone(),
        buses,
        hours,
        level_hours,
        labor_cost,
        report_cost,
        total_cost,
    })
}

/// Everything a study run needs apart from the study and its bus count.
///
/// Built once per calculation so consolidated and phase-wise runs share the
/// same resolved multipliers and calibration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct StudyPlan<'a> {
    pub catalog: &'a Catalog,
    pub calibration: &'a CalibrationSnapshot,
    pub multipliers: StudyMultipliers,
    pub split: ResourceSplit,
    pub rates: LaborRates,
    pub report: ReportConfig,
}

impl StudyPlan<'_> {
    pub fn run(&self, kind: StudyKind, buses: u32) -> Result<StudyResult> {
        let multipliers = self
            .multipliers
            .with_calibration(self.calibration.factor_for(kind));
        compute_study(
            kind,
            self.catalog.study(kind),
            buses,
            &multipliers,
            &self.split,
            &self.rates,
            &self.report,
        )
    }

    pub fn run_all<'k>(
        &self,
        kinds: impl IntoIterator<Item = &'k StudyKind>,
        buses: u32,
    ) -> Result<Vec<StudyResult>> {
        kinds
            .into_iter()
            .map(|kind| self.run(*kind, buses))
            .collect()
    }
}
