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
    catalog::{Catalog, Tier, Topology},
    errors::{ensure_positive, CalcEngineError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusCountSource {
    Derived,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusCount {
    pub value: u32,
    pub source: BusCountSource,
}

impl BusCount {
    pub fn is_override(&self) -> bool {
        matches!(self.source, BusCountSource::Override)
    }
}

/// Estimate the representative bus count for a load.
///
/// An override of one or more buses is returned as-is. Otherwise the count is
/// `ceil(load × tier multiplier × topology multiplier)`, never below one.
pub fn estimate_buses(
    total_load_mw: f64,
    tier: Tier,
    topology: Option<Topology>,
    custom_bus_count: Option<u32>,
    catalog: &Catalog,
) -> Result<BusCount> {
    if let Some(value) = custom_bus_count.filter(|value| *value >= 1) {
        return Ok(BusCount {
            value,
            source: BusCountSource::Override,
        });
    }

    ensure_positive("total_load_mw", total_load_mw)?;

    let raw = total_load_mw
        * catalog.tier_bus_multiplier.get(tier)
        * catalog.topology_bus_multiplier.get(topology);
    if !raw.is_finite() || raw.ceil() > f64::from(u32::MAX) {
        return Err(CalcEngineError::configuration(
            "total_load_mw",
            format!("load yields {raw} buses, beyond the representable range"),
        ));
    }
    let value = (raw.ceil() as u32).max(1);
    debug!(total_load_mw, raw, value, %tier, "derived bus count");

    Ok(BusCount {
        value,
        source: BusCountSource::Derived,
    })
}
