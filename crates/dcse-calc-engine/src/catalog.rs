//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
//! Constants catalog: study effort, report pricing and complexity multipliers.
//!
//! Every table is keyed by a closed enum and resolved with an exhaustive
//! `match`, so a missing category is a compile error rather than a silent
//! default. Catalogs are plain values handed to the engine explicitly.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::errors::{ensure_positive, CalcEngineError, Result};

/// Data-center reliability classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, Display,
)]
pub enum Tier {
    #[serde(rename = "tier_i", alias = "Tier I")]
    #[strum(serialize = "Tier I")]
    TierI,
    #[serde(rename = "tier_ii", alias = "Tier II")]
    #[strum(serialize = "Tier II")]
    TierII,
    #[serde(rename = "tier_iii", alias = "Tier III")]
    #[strum(serialize = "Tier III")]
    TierIII,
    #[serde(rename = "tier_iv", alias = "Tier IV")]
    #[strum(serialize = "Tier IV")]
    TierIV,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    #[default]
    Standard,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Radial,
    Hybrid,
    Ring,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Basic,
    #[default]
    Detailed,
    Comprehensive,
}

/// Selectable engineering study.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum StudyKind {
    #[strum(serialize = "load_flow")]
    LoadFlow,
    #[strum(serialize = "short_circuit")]
    ShortCircuit,
    #[serde(rename = "pdc", alias = "protective_device_coordination")]
    #[strum(serialize = "pdc")]
    ProtectiveDeviceCoordination,
    #[strum(serialize = "arc_flash")]
    ArcFlash,
    #[strum(serialize = "harmonics")]
    Harmonics,
    #[strum(serialize = "transients")]
    Transients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    pub name: String,
    pub base_hours_per_bus: f64,
    pub base_report_price: f64,
    /// Qualitative label shown to operators; never used in arithmetic.
    pub complexity: String,
}

impl StudyDefinition {
    pub fn new(
        name: impl Into<String>,
        base_hours_per_bus: f64,
        base_report_price: f64,
        complexity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_hours_per_bus,
            base_report_price,
            complexity: complexity.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyTable {
    pub load_flow: StudyDefinition,
    pub short_circuit: StudyDefinition,
    pub pdc: StudyDefinition,
    pub arc_flash: StudyDefinition,
    pub harmonics: StudyDefinition,
    pub transients: StudyDefinition,
}

impl StudyTable {
    pub fn get(&self, kind: StudyKind) -> &StudyDefinition {
        match kind {
            StudyKind::LoadFlow => &self.load_flow,
            StudyKind::ShortCircuit => &self.short_circuit,
            StudyKind::ProtectiveDeviceCoordination => &self.pdc,
            StudyKind::ArcFlash => &self.arc_flash,
            StudyKind::Harmonics => &self.harmonics,
            StudyKind::Transients => &self.transients,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub tier_i: f64,
    pub tier_ii: f64,
    pub tier_iii: f64,
    pub tier_iv: f64,
}

impl TierTable {
    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::TierI => self.tier_i,
            Tier::TierII => self.tier_ii,
            Tier::TierIII => self.tier_iii,
            Tier::TierIV => self.tier_iv,
        }
    }

    fn is_strictly_increasing(&self) -> bool {
        self.tier_i < self.tier_ii && self.tier_ii < self.tier_iii && self.tier_iii < self.tier_iv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTable {
    pub standard: f64,
    pub urgent: f64,
}

impl DeliveryTable {
    pub fn get(&self, delivery: Delivery) -> f64 {
        match delivery {
            Delivery::Standard => self.standard,
            Delivery::Urgent => self.urgent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyTable {
    pub radial: f64,
    pub hybrid: f64,
    pub ring: f64,
}

impl TopologyTable {
    /// An absent topology resolves to the identity multiplier.
    pub fn get(&self, topology: Option<Topology>) -> f64 {
        match topology {
            None => 1.0,
            Some(Topology::Radial) => self.radial,
            Some(Topology::Hybrid) => self.hybrid,
            Some(Topology::Ring) => self.ring,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportFormatTable {
    pub basic: f64,
    pub detailed: f64,
    pub comprehensive: f64,
}

impl ReportFormatTable {
    pub fn get(&self, format: ReportFormat) -> f64 {
        match format {
            ReportFormat::Basic => self.basic,
            ReportFormat::Detailed => self.detailed,
            ReportFormat::Comprehensive => self.comprehensive,
        }
    }
}

/// Closed interval an operator-facing factor is expected to stay within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBounds {
    pub min: f64,
    pub max: f64,
}

impl FactorBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTable {
    pub premium: FactorBounds,
    pub historical_model: FactorBounds,
    pub modeling: FactorBounds,
    pub repeat_customer: FactorBounds,
    pub phase_extension: FactorBounds,
    pub overall_competitive: FactorBounds,
    pub report_complexity: FactorBounds,
    pub similar_model: FactorBounds,
    pub client_multiplier: FactorBounds,
}

impl Default for BoundsTable {
    fn default() -> Self {
        Self {
            premium: FactorBounds::new(1.0, 2.0),
            historical_model: FactorBounds::new(0.70, 0.95),
            modeling: FactorBounds::new(0.80, 1.20),
            repeat_customer: FactorBounds::new(0.75, 0.95),
            phase_extension: FactorBounds::new(0.80, 0.95),
            overall_competitive: FactorBounds::new(0.75, 0.98),
            report_complexity: FactorBounds::new(0.5, 2.0),
            similar_model: FactorBounds::new(0.70, 1.0),
            client_multiplier: FactorBounds::new(0.5, 2.0),
        }
    }
}

impl BoundsTable {
    fn entries(&self) -> [(&'static str, FactorBounds); 9] {
        [
            ("bounds.premium", self.premium),
            ("bounds.historical_model", self.historical_model),
            ("bounds.modeling", self.modeling),
            ("bounds.repeat_customer", self.repeat_customer),
            ("bounds.phase_extension", self.phase_extension),
            ("bounds.overall_competitive", self.overall_competitive),
            ("bounds.report_complexity", self.report_complexity),
            ("bounds.similar_model", self.similar_model),
            ("bounds.client_multiplier", self.client_multiplier),
        ]
    }
}

/// How strictly pricing factors are checked against [`BoundsTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Only negative or non-finite factors are rejected.
    #[default]
    Permissive,
    /// Active factors outside their documented bounds are rejected as well.
    Strict,
}

/// Named catalog presets matching the calibrations seen in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CatalogPreset {
    #[default]
    Standard,
    MarketRecalibrated,
}

impl CatalogPreset {
    pub fn catalog(self) -> Catalog {
        match self {
            CatalogPreset::Standard => Catalog::standard(),
            CatalogPreset::MarketRecalibrated => Catalog::market_recalibrated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    pub studies: StudyTable,
    /// Buses per MW of total load for each tier.
    pub tier_bus_multiplier: TierTable,
    /// Effort multiplier applied to study hours for each tier.
    pub tier_complexity: TierTable,
    pub delivery: DeliveryTable,
    pub topology_bus_multiplier: TopologyTable,
    pub topology_complexity: TopologyTable,
    pub report_format: ReportFormatTable,
    #[serde(default)]
    pub bounds: BoundsTable,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Base model tables.
    pub fn standard() -> Self {
        Self {
            name: "standard".into(),
            studies: StudyTable {
                load_flow: StudyDefinition::new("Load Flow Study", 0.8, 18_000.0, "Medium"),
                short_circuit: StudyDefinition::new(
                    "Short Circuit Study",
                    1.0,
                    22_000.0,
                    "Medium-High",
                ),
                pdc: StudyDefinition::new("Protective Device Coordination", 1.5, 32_000.0, "High"),
                arc_flash: StudyDefinition::new("Arc Flash Study", 1.2, 25_000.0, "High"),
                harmonics: StudyDefinition::new("Harmonic Analysis", 1.1, 28_000.0, "High"),
                transients: StudyDefinition::new(
                    "Transient Stability Study",
                    1.6,
                    35_000.0,
                    "Very High",
                ),
            },
            tier_bus_multiplier: TierTable {
                tier_i: 1.5,
                tier_ii: 1.8,
                tier_iii: 2.1,
                tier_iv: 2.6,
            },
            tier_complexity: TierTable {
                tier_i: 1.0,
                tier_ii: 1.15,
                tier_iii: 1.3,
                tier_iv: 1.6,
            },
            delivery: DeliveryTable {
                standard: 1.0,
                urgent: 1.3,
            },
            topology_bus_multiplier: TopologyTable {
                radial: 1.0,
                hybrid: 1.1,
                ring: 1.2,
            },
            topology_complexity: TopologyTable {
                radial: 1.0,
                hybrid: 1.1,
                ring: 1.25,
            },
            report_format: ReportFormatTable {
                basic: 0.8,
                detailed: 1.0,
                comprehensive: 1.4,
            },
            bounds: BoundsTable::default(),
        }
    }

    /// Tables re-fitted against recent tender outcomes: lower per-bus effort,
    /// cheaper reports, softer urgency premium.
    pub fn market_recalibrated() -> Self {
        Self {
            name: "market_recalibrated".into(),
            studies: StudyTable {
                load_flow: StudyDefinition::new("Load Flow Study", 0.7, 15_000.0, "Medium"),
                short_circuit: StudyDefinition::new(
                    "Short Circuit Study",
                    0.9,
                    19_000.0,
                    "Medium-High",
                ),
                pdc: StudyDefinition::new("Protective Device Coordination", 1.3, 28_000.0, "High"),
                arc_flash: StudyDefinition::new("Arc Flash Study", 1.0, 22_000.0, "High"),
                harmonics: StudyDefinition::new("Harmonic Analysis", 0.9, 24_000.0, "High"),
                transients: StudyDefinition::new(
                    "Transient Stability Study",
                    1.4,
                    30_000.0,
                    "Very High",
                ),
            },
            tier_bus_multiplier: TierTable {
                tier_i: 1.4,
                tier_ii: 1.7,
                tier_iii: 2.0,
                tier_iv: 2.4,
            },
            tier_complexity: TierTable {
                tier_i: 1.0,
                tier_ii: 1.1,
                tier_iii: 1.25,
                tier_iv: 1.5,
            },
            delivery: DeliveryTable {
                standard: 1.0,
                urgent: 1.25,
            },
            topology_bus_multiplier: TopologyTable {
                radial: 1.0,
                hybrid: 1.1,
                ring: 1.2,
            },
            topology_complexity: TopologyTable {
                radial: 1.0,
                hybrid: 1.08,
                ring: 1.2,
            },
            report_format: ReportFormatTable {
                basic: 0.85,
                detailed: 1.0,
                comprehensive: 1.3,
            },
            bounds: BoundsTable::default(),
        }
    }

    pub fn study(&self, kind: StudyKind) -> &StudyDefinition {
        self.studies.get(kind)
    }

    /// Check the structural invariants every catalog must satisfy.
    pub fn validate(&self) -> Result<()> {
        if !self.tier_bus_multiplier.is_strictly_increasing() {
            return Err(CalcEngineError::configuration(
                "catalog.tier_bus_multiplier",
                "must be strictly increasing from Tier I to Tier IV",
            ));
        }
        for tier in Tier::iter() {
            ensure_positive(
                format!("catalog.tier_bus_multiplier.{tier}"),
                self.tier_bus_multiplier.get(tier),
            )?;
            ensure_positive(
                format!("catalog.tier_complexity.{tier}"),
                self.tier_complexity.get(tier),
            )?;
        }
        for delivery in Delivery::iter() {
            ensure_positive(
                format!("catalog.delivery.{delivery}"),
                self.delivery.get(delivery),
            )?;
        }
        for topology in Topology::iter() {
            ensure_positive(
                format!("catalog.topology_bus_multiplier.{topology}"),
                self.topology_bus_multiplier.get(Some(topology)),
            )?;
            ensure_positive(
                format!("catalog.topology_complexity.{topology}"),
                self.topology_complexity.get(Some(topology)),
            )?;
        }
        for format in ReportFormat::iter() {
            ensure_positive(
                format!("catalog.report_format.{format}"),
                self.report_format.get(format),
            )?;
        }
        for kind in StudyKind::iter() {
            let study = self.study(kind);
            ensure_positive(
                format!("catalog.studies.{kind}.base_hours_per_bus"),
                study.base_hours_per_bus,
            )?;
            ensure_positive(
                format!("catalog.studies.{kind}.base_report_price"),
                study.base_report_price,
            )?;
        }
        for (field, bounds) in self.bounds.entries() {
            if !(bounds.min.is_finite() && bounds.max.is_finite() && bounds.min <= bounds.max) {
                return Err(CalcEngineError::configuration(
                    field,
                    format!("min {} must not exceed max {}", bounds.min, bounds.max),
                ));
            }
        }
        Ok(())
    }
}
