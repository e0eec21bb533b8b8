//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
//! Deterministic cost engine for data-center power-system studies.
//!
//! Sizing inputs become a bus count, bus count becomes study hours split
//! across three proficiency levels, hours become labor and report cost, and
//! the study totals are priced under a standard and a competitive view.

pub mod aggregate;
pub mod allocation;
pub mod buses;
pub mod calibration;
pub mod catalog;
pub mod errors;
pub mod io;
pub mod model;
pub mod phases;
pub mod reports;
pub mod study;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    aggregate::{aggregate, CostSummary},
    buses::{estimate_buses, BusCount},
    calibration::{CalibrationSnapshot, CalibrationStore},
    catalog::{BoundsPolicy, Catalog},
    model::{CalculationMode, ClientType, ProjectConfiguration, ProjectType},
    phases::{compute_phases, PhaseResult},
    reports::ReportExporter,
    study::{StudyPlan, StudyResult},
};

pub use errors::{CalcEngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Reduction,
    Premium,
    Informational,
}

/// A pricing factor that shaped the estimate, for operator-facing summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFactor {
    pub label: String,
    pub factor: f64,
    pub kind: FactorKind,
}

impl AppliedFactor {
    fn new(label: &str, factor: f64, kind: FactorKind) -> Self {
        Self {
            label: label.to_owned(),
            factor,
            kind,
        }
    }
}

/// Standard and competitive price of one study or phase line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingLine {
    pub label: String,
    pub standard_cost: f64,
    pub competitive_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub catalog: String,
    pub calculation_mode: CalculationMode,
    pub total_load_mw: f64,
    pub buses: BusCount,
    /// Consolidated study results; empty in phase-wise mode.
    pub studies: Vec<StudyResult>,
    /// Phase results; empty in consolidated mode.
    pub phases: Vec<PhaseResult>,
    pub total_hours: f64,
    pub summary: CostSummary,
    pub pricing_lines: Vec<PricingLine>,
    pub applied_factors: Vec<AppliedFactor>,
    pub calibration: CalibrationSnapshot,
}

impl Estimate {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }
}

/// Runs the full pipeline with the permissive bounds policy.
pub fn estimate(
    config: &ProjectConfiguration,
    catalog: &Catalog,
    calibration: &CalibrationSnapshot,
) -> Result<Estimate> {
    estimate_with_policy(config, catalog, calibration, BoundsPolicy::Permissive)
}

pub fn estimate_with_policy(
    config: &ProjectConfiguration,
    catalog: &Catalog,
    calibration: &CalibrationSnapshot,
    policy: BoundsPolicy,
) -> Result<Estimate> {
    catalog.validate()?;
    config.validate(catalog, policy)?;
    calibration.validate()?;

    if config.selected_studies.is_empty() {
        warn!("no studies selected; estimate carries additional costs only");
    }

    let total_load_mw = config.total_load_mw();
    let buses = estimate_buses(
        total_load_mw,
        config.tier,
        config.topology,
        config.custom_bus_count,
        catalog,
    )?;
    info!(
        buses = buses.value,
        overridden = buses.is_override(),
        "bus count resolved"
    );

    let plan = StudyPlan {
        catalog,
        calibration,
        multipliers: config.study_multipliers(catalog),
        split: config.resource_split,
        rates: config.rates,
        report: config.report_config(catalog),
    };

    let (studies, phases) = match config.calculation_mode {
        CalculationMode::Consolidated => {
            info!("Running consolidated study costing...");
            (plan.run_all(&config.selected_studies, buses.value)?, Vec::new())
        }
        CalculationMode::PhaseWise => {
            info!(phases = config.phases.len(), "Running phase-wise study costing...");
            let phases = compute_phases(
                &config.phases,
                config.tier,
                config.topology,
                &config.selected_studies,
                &plan,
            )?;
            (Vec::new(), phases)
        }
    };

    let phase_results = match config.calculation_mode {
        CalculationMode::Consolidated => None,
        CalculationMode::PhaseWise => Some(phases.as_slice()),
    };
    let summary = aggregate(
        &studies,
        phase_results,
        &config.adjustments(),
        config.additional_costs.breakdown()?,
        &config.competitive_chain(),
    )?;

    let total_hours = studies.iter().map(|study| study.hours).sum::<f64>()
        + phases.iter().map(|phase| phase.total_hours).sum::<f64>();
    let pricing_lines = pricing_lines(&studies, &phases, summary.competitive_multiplier);
    let applied_factors = applied_factors(config, calibration);

    Ok(Estimate {
        catalog: catalog.name.clone(),
        calculation_mode: config.calculation_mode,
        total_load_mw,
        buses,
        studies,
        phases,
        total_hours,
        summary,
        pricing_lines,
        applied_factors,
        calibration: *calibration,
    })
}

fn pricing_lines(
    studies: &[StudyResult],
    phases: &[PhaseResult],
    competitive_multiplier: f64,
) -> Vec<PricingLine> {
    let line = |label: &str, standard_cost: f64| PricingLine {
        label: label.to_owned(),
        standard_cost,
        competitive_cost: standard_cost * competitive_multiplier,
    };
    studies
        .iter()
        .map(|study| line(&study.name, study.total_cost))
        .chain(phases.iter().map(|phase| line(&phase.name, phase.total_cost)))
        .collect()
}

fn applied_factors(
    config: &ProjectConfiguration,
    calibration: &CalibrationSnapshot,
) -> Vec<AppliedFactor> {
    let pricing = &config.pricing;
    let mut factors = Vec::new();

    if pricing.historical_model.enabled {
        factors.push(AppliedFactor::new(
            "historical model",
            pricing.historical_model.factor,
            FactorKind::Reduction,
        ));
    }
    if pricing.repeat_customer.enabled {
        factors.push(AppliedFactor::new(
            "repeat customer",
            pricing.repeat_customer.factor,
            FactorKind::Reduction,
        ));
    }
    if config.project_type == ProjectType::PhaseExtension {
        factors.push(AppliedFactor::new(
            "phase extension",
            pricing.phase_extension_discount,
            FactorKind::Reduction,
        ));
    }
    if pricing.similar_model.enabled {
        factors.push(AppliedFactor::new(
            "similar model",
            pricing.similar_model.factor,
            FactorKind::Reduction,
        ));
    }
    factors.push(AppliedFactor::new(
        "overall competitive",
        pricing.overall_competitive_factor,
        FactorKind::Reduction,
    ));
    if config.client_type == ClientType::Premium {
        factors.push(AppliedFactor::new(
            "premium client",
            pricing.premium_factor,
            FactorKind::Premium,
        ));
    }
    if pricing.client_multiplier != 1.0 {
        factors.push(AppliedFactor::new(
            "client multiplier",
            pricing.client_multiplier,
            if pricing.client_multiplier > 1.0 {
                FactorKind::Premium
            } else {
                FactorKind::Reduction
            },
        ));
    }
    factors.push(AppliedFactor::new(
        "modeling factor",
        pricing.modeling_factor,
        FactorKind::Informational,
    ));
    factors.push(AppliedFactor::new(
        "report complexity",
        config.report_complexity_factor,
        FactorKind::Informational,
    ));
    if !calibration.is_identity() {
        factors.push(AppliedFactor::new(
            "calibration (global)",
            calibration.global,
            FactorKind::Informational,
        ));
    }
    factors
}

/// Catalog, calibration store and bounds policy bundled for repeated runs.
#[derive(Debug, Clone)]
pub struct Estimator {
    catalog: Arc<Catalog>,
    calibration: Arc<CalibrationStore>,
    policy: BoundsPolicy,
}

impl Estimator {
    pub fn new(catalog: Catalog) -> Result<Self> {
        catalog.validate()?;
        Ok(Self {
            catalog: Arc::new(catalog),
            calibration: Arc::new(CalibrationStore::default()),
            policy: BoundsPolicy::default(),
        })
    }

    pub fn with_calibration(mut self, store: Arc<CalibrationStore>) -> Self {
        self.calibration = store;
        self
    }

    pub fn with_policy(mut self, policy: BoundsPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    /// Runs one estimate against a single calibration snapshot.
    pub fn run(&self, config: &ProjectConfiguration) -> Result<Estimate> {
        let snapshot = self.calibration.snapshot();
        estimate_with_policy(config, &self.catalog, &snapshot, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocation::ResourceSplit,
        catalog::{StudyKind, Tier, Topology},
        model::{DiscountToggle, PricingFactors},
        phases::PhaseSpec,
    };

    fn scenario() -> ProjectConfiguration {
        let mut config = ProjectConfiguration::new(15.0, 10.0, 5.0, Tier::TierIII)
            .with_studies([StudyKind::LoadFlow, StudyKind::ShortCircuit]);
        config.topology = Some(Topology::Radial);
        config.resource_split = ResourceSplit::new(20.0, 30.0, 50.0);
        config.pricing = PricingFactors::neutral();
        config
    }

    #[test]
    fn estimate_pipeline() {
        let summary = estimate(
            &scenario(),
            &Catalog::standard(),
            &CalibrationSnapshot::identity(),
        )
        .unwrap();

        assert_eq!(summary.buses.value, 63);
        assert_eq!(summary.studies.len(), 2);
        assert!(summary.phases.is_empty());
        assert!((summary.summary.standard_cost - 145_405.3).abs() < 1e-6);
        assert_eq!(summary.summary.competitive_cost, summary.summary.standard_cost);
        assert!((summary.total_hours - (65.52 + 81.9)).abs() < 1e-9);
        assert_eq!(summary.pricing_lines.len(), 2);
    }

    #[test]
    fn estimate_rejects_malformed_catalog() {
        let mut catalog = Catalog::standard();
        catalog.tier_bus_multiplier.tier_iii = -2.1;

        let err = estimate(&scenario(), &catalog, &CalibrationSnapshot::identity()).unwrap_err();
        assert_eq!(err.field(), Some("catalog.tier_bus_multiplier"));
    }

    #[test]
    fn phase_wise_pipeline_sums_phases() {
        let mut config = scenario();
        config.calculation_mode = CalculationMode::PhaseWise;
        config.phases = vec![PhaseSpec::new("Phase 1", 15.0), PhaseSpec::new("Phase 2", 15.0)];
        config.pricing.historical_model = DiscountToggle::enabled(0.85);

        let summary = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
            .unwrap();

        assert!(summary.studies.is_empty());
        assert_eq!(summary.phases.len(), 2);
        let phase_total: f64 = summary.phases.iter().map(|p| p.total_cost).sum();
        assert!((summary.summary.raw_total - phase_total).abs() < 1e-9);
        assert!((summary.summary.competitive_multiplier - 0.85).abs() < 1e-12);
        assert!(summary
            .applied_factors
            .iter()
            .any(|factor| factor.label == "historical model"));
    }

    #[test]
    fn estimator_uses_published_calibration() {
        let estimator = Estimator::new(Catalog::standard()).unwrap();
        let baseline = estimator.run(&scenario()).unwrap();
        estimator
            .calibration()
            .update(|snapshot| snapshot.with_global(2.0))
            .unwrap();
        let calibrated = estimator.run(&scenario()).unwrap();

        let baseline_labor: f64 = baseline.studies.iter().map(|s| s.labor_cost).sum();
        let calibrated_labor: f64 = calibrated.studies.iter().map(|s| s.labor_cost).sum();
        assert!((calibrated_labor - 2.0 * baseline_labor).abs() < 1e-6);
        assert_eq!(calibrated.calibration.global, 2.0);
    }
}
