//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    buses::estimate_buses,
    catalog::{StudyKind, Tier, Topology},
    errors::{ensure_positive, CalcEngineError, Result},
    study::{StudyPlan, StudyResult},
};

/// A capacity slice of the project, costed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub capacity_mw: f64,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>, capacity_mw: f64) -> Self {
        Self {
            name: name.into(),
            capacity_mw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub name: String,
    pub capacity_mw: f64,
    pub buses: u32,
    pub studies: Vec<StudyResult>,
    pub total_hours: f64,
    pub total_cost: f64,
}

impl PhaseResult {
    pub fn average_cost_per_bus(&self) -> f64 {
        if self.buses == 0 {
            0.0
        } else {
            self.total_cost / f64::from(self.buses)
        }
    }
}

pub(crate) fn validate_phases(phases: &[PhaseSpec]) -> Result<()> {
    if phases.is_empty() {
        return Err(CalcEngineError::configuration(
            "phases",
            "phase-wise calculation requires at least one phase",
        ));
    }
    for (index, phase) in phases.iter().enumerate() {
        ensure_positive(format!("phases[{index}].capacity_mw"), phase.capacity_mw)?;
    }
    Ok(())
}

/// Cost every selected study once per phase, each against the phase's own
/// derived bus count.
pub fn compute_phases(
    phases: &[PhaseSpec],
    tier: Tier,
    topology: Option<Topology>,
    studies: &BTreeSet<StudyKind>,
    plan: &StudyPlan<'_>,
) -> Result<Vec<PhaseResult>> {
    validate_phases(phases)?;

    phases
        .iter()
        .map(|phase| {
            let buses = estimate_buses(phase.capacity_mw, tier, topology, None, plan.catalog)?;
            let results = plan.run_all(studies, buses.value)?;
            let total_hours: f64 = results.iter().map(|study| study.hours).sum();
            let total_cost: f64 = results.iter().map(|study| study.total_cost).sum();
            debug!(phase = %phase.name, buses = buses.value, total_cost, "phase costed");
            Ok(PhaseResult {
                name: phase.name.clone(),
                capacity_mw: phase.capacity_mw,
                buses: buses.value,
                studies: results,
                total_hours,
                total_cost,
            })
        })
        .collect()
}
