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

use crate::{
    aggregate::{AdditionalCostBreakdown, Adjustments, CompetitiveChain},
    allocation::{LaborRates, ResourceSplit},
    catalog::{
        BoundsPolicy, Catalog, Delivery, FactorBounds, ReportFormat, StudyKind, Tier, Topology,
    },
    errors::{ensure_non_negative, ensure_positive, CalcEngineError, Result},
    phases::{validate_phases, PhaseSpec},
    study::{ReportConfig, StudyMultipliers},
};

fn unity() -> f64 {
    1.0
}

fn default_premium_factor() -> f64 {
    1.3
}

fn default_phase_extension_discount() -> f64 {
    0.90
}

fn default_overall_competitive_factor() -> f64 {
    0.88
}

fn default_historical_model() -> DiscountToggle {
    DiscountToggle::disabled(0.85)
}

fn default_repeat_customer() -> DiscountToggle {
    DiscountToggle::disabled(0.88)
}

fn default_similar_model() -> DiscountToggle {
    DiscountToggle::disabled(0.90)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    #[default]
    Consolidated,
    PhaseWise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[default]
    Fresh,
    PhaseExtension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    #[default]
    Normal,
    Premium,
}

/// A discount that only applies while its toggle is on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountToggle {
    #[serde(default)]
    pub enabled: bool,
    pub factor: f64,
}

impl DiscountToggle {
    pub fn enabled(factor: f64) -> Self {
        Self {
            enabled: true,
            factor,
        }
    }

    pub fn disabled(factor: f64) -> Self {
        Self {
            enabled: false,
            factor,
        }
    }

    /// The factor when enabled, identity otherwise.
    pub fn effective(&self) -> f64 {
        if self.enabled {
            self.factor
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingFactors {
    /// Applied only to premium clients.
    #[serde(default = "default_premium_factor")]
    pub premium_factor: f64,
    /// Applied only to phase-extension projects.
    #[serde(default = "default_phase_extension_discount")]
    pub phase_extension_discount: f64,
    #[serde(default = "unity")]
    pub modeling_factor: f64,
    #[serde(default = "unity")]
    pub client_multiplier: f64,
    #[serde(default = "default_similar_model")]
    pub similar_model: DiscountToggle,
    #[serde(default = "default_historical_model")]
    pub historical_model: DiscountToggle,
    #[serde(default = "default_repeat_customer")]
    pub repeat_customer: DiscountToggle,
    #[serde(default = "default_overall_competitive_factor")]
    pub overall_competitive_factor: f64,
}

impl Default for PricingFactors {
    fn default() -> Self {
        Self {
            premium_factor: default_premium_factor(),
            phase_extension_discount: default_phase_extension_discount(),
            modeling_factor: 1.0,
            client_multiplier: 1.0,
            similar_model: default_similar_model(),
            historical_model: default_historical_model(),
            repeat_customer: default_repeat_customer(),
            overall_competitive_factor: default_overall_competitive_factor(),
        }
    }
}

impl PricingFactors {
    /// Every factor set to identity and every toggle off.
    pub fn neutral() -> Self {
        Self {
            premium_factor: 1.0,
            phase_extension_discount: 1.0,
            modeling_factor: 1.0,
            client_multiplier: 1.0,
            similar_model: DiscountToggle::disabled(1.0),
            historical_model: DiscountToggle::disabled(1.0),
            repeat_customer: DiscountToggle::disabled(1.0),
            overall_competitive_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitCharge {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub unit_price: f64,
}

impl UnitCharge {
    pub fn new(count: u32, unit_price: f64) -> Self {
        Self { count, unit_price }
    }

    pub fn total(&self) -> f64 {
        f64::from(self.count) * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiscCharge {
    #[serde(default = "MiscCharge::default_description")]
    pub description: String,
    pub amount: f64,
}

impl MiscCharge {
    fn default_description() -> String {
        "Miscellaneous".to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdditionalCosts {
    #[serde(default)]
    pub labels: UnitCharge,
    #[serde(default)]
    pub site_visits: UnitCharge,
    #[serde(default)]
    pub meetings: UnitCharge,
    #[serde(default)]
    pub miscellaneous: Option<MiscCharge>,
}

impl AdditionalCosts {
    pub fn breakdown(&self) -> Result<AdditionalCostBreakdown> {
        ensure_non_negative("additional_costs.labels.unit_price", self.labels.unit_price)?;
        ensure_non_negative(
            "additional_costs.site_visits.unit_price",
            self.site_visits.unit_price,
        )?;
        ensure_non_negative(
            "additional_costs.meetings.unit_price",
            self.meetings.unit_price,
        )?;
        if let Some(misc) = &self.miscellaneous {
            ensure_non_negative("additional_costs.miscellaneous.amount", misc.amount)?;
        }
        Ok(AdditionalCostBreakdown {
            labels: self.labels.total(),
            site_visits: self.site_visits.total(),
            meetings: self.meetings.total(),
            miscellaneous: self.miscellaneous.as_ref().map_or(0.0, |misc| misc.amount),
            miscellaneous_description: self
                .miscellaneous
                .as_ref()
                .map(|misc| misc.description.clone()),
        })
    }
}

/// Request handed to the engine by its collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfiguration {
    #[serde(default)]
    pub it_load_mw: f64,
    #[serde(default)]
    pub mechanical_load_mw: f64,
    #[serde(default)]
    pub house_load_mw: f64,
    pub tier: Tier,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub topology: Option<Topology>,
    #[serde(default)]
    pub report_format: ReportFormat,
    #[serde(default = "unity")]
    pub report_complexity_factor: f64,
    #[serde(default)]
    pub selected_studies: BTreeSet<StudyKind>,
    #[serde(default)]
    pub calculation_mode: CalculationMode,
    #[serde(default)]
    pub phases: Vec<PhaseSpec>,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub resource_split: ResourceSplit,
    #[serde(default)]
    pub rates: LaborRates,
    #[serde(default)]
    pub pricing: PricingFactors,
    #[serde(default)]
    pub additional_costs: AdditionalCosts,
    #[serde(default)]
    pub custom_bus_count: Option<u32>,
}

impl ProjectConfiguration {
    /// Configuration with the tool's default commercial settings.
    pub fn new(it_load_mw: f64, mechanical_load_mw: f64, house_load_mw: f64, tier: Tier) -> Self {
        Self {
            it_load_mw,
            mechanical_load_mw,
            house_load_mw,
            tier,
            delivery: Delivery::default(),
            topology: None,
            report_format: ReportFormat::default(),
            report_complexity_factor: 1.0,
            selected_studies: BTreeSet::new(),
            calculation_mode: CalculationMode::default(),
            phases: Vec::new(),
            project_type: ProjectType::default(),
            client_type: ClientType::default(),
            resource_split: ResourceSplit::default(),
            rates: LaborRates::default(),
            pricing: PricingFactors::default(),
            additional_costs: AdditionalCosts::default(),
            custom_bus_count: None,
        }
    }

    pub fn with_studies(mut self, studies: impl IntoIterator<Item = StudyKind>) -> Self {
        self.selected_studies = studies.into_iter().collect();
        self
    }

    pub fn total_load_mw(&self) -> f64 {
        self.it_load_mw + self.mechanical_load_mw + self.house_load_mw
    }

    /// For collaborators that surface a "nothing selected" state instead of
    /// running a zero-cost estimate.
    pub fn ensure_selection(&self) -> Result<()> {
        if self.selected_studies.is_empty() {
            Err(CalcEngineError::NothingSelected)
        } else {
            Ok(())
        }
    }

    pub fn validate(&self, catalog: &Catalog, policy: BoundsPolicy) -> Result<()> {
        ensure_non_negative("it_load_mw", self.it_load_mw)?;
        ensure_non_negative("mechanical_load_mw", self.mechanical_load_mw)?;
        ensure_non_negative("house_load_mw", self.house_load_mw)?;
        ensure_positive("total_load_mw", self.total_load_mw())?;

        if self.custom_bus_count == Some(0) {
            return Err(CalcEngineError::configuration(
                "custom_bus_count",
                "override must be at least one bus",
            ));
        }
        if self.calculation_mode == CalculationMode::PhaseWise {
            validate_phases(&self.phases)?;
        }

        ensure_non_negative("report_complexity_factor", self.report_complexity_factor)?;
        self.resource_split.validate()?;
        self.rates.validate()?;
        self.validate_pricing()?;
        self.additional_costs.breakdown()?;

        if policy == BoundsPolicy::Strict {
            self.validate_bounds(catalog)?;
        }
        Ok(())
    }

    fn validate_pricing(&self) -> Result<()> {
        let pricing = &self.pricing;
        ensure_non_negative("pricing.premium_factor", pricing.premium_factor)?;
        ensure_non_negative(
            "pricing.phase_extension_discount",
            pricing.phase_extension_discount,
        )?;
        ensure_non_negative("pricing.modeling_factor", pricing.modeling_factor)?;
        ensure_non_negative("pricing.client_multiplier", pricing.client_multiplier)?;
        ensure_non_negative("pricing.similar_model.factor", pricing.similar_model.factor)?;
        ensure_non_negative(
            "pricing.historical_model.factor",
            pricing.historical_model.factor,
        )?;
        ensure_non_negative(
            "pricing.repeat_customer.factor",
            pricing.repeat_customer.factor,
        )?;
        ensure_non_negative(
            "pricing.overall_competitive_factor",
            pricing.overall_competitive_factor,
        )
    }

    /// Only factors that actually take part in the calculation are checked.
    fn validate_bounds(&self, catalog: &Catalog) -> Result<()> {
        let bounds = &catalog.bounds;
        let pricing = &self.pricing;
        let mut checks: Vec<(&str, f64, FactorBounds)> = vec![
            ("pricing.modeling_factor", pricing.modeling_factor, bounds.modeling),
            (
                "pricing.overall_competitive_factor",
                pricing.overall_competitive_factor,
                bounds.overall_competitive,
            ),
            (
                "report_complexity_factor",
                self.report_complexity_factor,
                bounds.report_complexity,
            ),
            (
                "pricing.client_multiplier",
                pricing.client_multiplier,
                bounds.client_multiplier,
            ),
        ];
        if self.client_type == ClientType::Premium {
            checks.push(("pricing.premium_factor", pricing.premium_factor, bounds.premium));
        }
        if self.project_type == ProjectType::PhaseExtension {
            checks.push((
                "pricing.phase_extension_discount",
                pricing.phase_extension_discount,
                bounds.phase_extension,
            ));
        }
        if pricing.similar_model.enabled {
            checks.push((
                "pricing.similar_model.factor",
                pricing.similar_model.factor,
                bounds.similar_model,
            ));
        }
        if pricing.historical_model.enabled {
            checks.push((
                "pricing.historical_model.factor",
                pricing.historical_model.factor,
                bounds.historical_model,
            ));
        }
        if pricing.repeat_customer.enabled {
            checks.push((
                "pricing.repeat_customer.factor",
                pricing.repeat_customer.factor,
                bounds.repeat_customer,
            ));
        }

        for (field, value, range) in checks {
            if !range.contains(value) {
                return Err(CalcEngineError::configuration(
                    field,
                    format!("{value} is outside [{}, {}]", range.min, range.max),
                ));
            }
        }
        Ok(())
    }

    /// Effort multipliers resolved from the catalog, calibration still identity.
    pub fn study_multipliers(&self, catalog: &Catalog) -> StudyMultipliers {
        StudyMultipliers {
            tier_complexity: catalog.tier_complexity.get(self.tier),
            delivery: catalog.delivery.get(self.delivery),
            topology: catalog.topology_complexity.get(self.topology),
            modeling_factor: self.pricing.modeling_factor,
            calibration_factor: 1.0,
        }
    }

    pub fn report_config(&self, catalog: &Catalog) -> ReportConfig {
        ReportConfig {
            format_multiplier: catalog.report_format.get(self.report_format),
            complexity_factor: self.report_complexity_factor,
        }
    }

    pub fn adjustments(&self) -> Adjustments {
        let pricing = &self.pricing;
        Adjustments {
            premium_factor: match self.client_type {
                ClientType::Premium => pricing.premium_factor,
                ClientType::Normal => 1.0,
            },
            phase_extension_discount: match self.project_type {
                ProjectType::PhaseExtension => pricing.phase_extension_discount,
                ProjectType::Fresh => 1.0,
            },
            client_multiplier: pricing.client_multiplier,
            similar_model_discount: pricing.similar_model.effective(),
        }
    }

    /// Historical model, repeat customer, overall reduction, in that order.
    pub fn competitive_chain(&self) -> CompetitiveChain {
        let pricing = &self.pricing;
        CompetitiveChain::new()
            .with("historical model", pricing.historical_model.effective())
            .with("repeat customer", pricing.repeat_customer.effective())
            .with("overall competitive", pricing.overall_competitive_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProjectConfiguration {
        ProjectConfiguration::new(15.0, 10.0, 5.0, Tier::TierIII)
            .with_studies([StudyKind::LoadFlow])
    }

    #[test]
    fn minimal_yaml_picks_up_defaults() {
        let parsed: ProjectConfiguration = serde_yaml::from_str(
            r#"
it_load_mw: 15
mechanical_load_mw: 10
house_load_mw: 5
tier: tier_iii
selected_studies: [load_flow, short_circuit]
"#,
        )
        .unwrap();
        assert_eq!(parsed.total_load_mw(), 30.0);
        assert_eq!(parsed.report_format, ReportFormat::Detailed);
        assert_eq!(parsed.rates, LaborRates::default());
        assert_eq!(parsed.pricing.overall_competitive_factor, 0.88);
        assert!(!parsed.pricing.historical_model.enabled);
        assert_eq!(parsed.selected_studies.len(), 2);
    }

    #[test]
    fn toggled_off_factors_resolve_to_identity() {
        let config = config();
        let adjustments = config.adjustments();
        assert_eq!(adjustments, Adjustments::default());
        let chain = config.competitive_chain();
        assert!((chain.multiplier() - 0.88).abs() < 1e-12);
    }

    #[test]
    fn premium_and_extension_apply_when_selected() {
        let mut config = config();
        config.client_type = ClientType::Premium;
        config.project_type = ProjectType::PhaseExtension;
        let adjustments = config.adjustments();
        assert_eq!(adjustments.premium_factor, 1.3);
        assert_eq!(adjustments.phase_extension_discount, 0.90);
    }

    #[test]
    fn negative_load_component_is_rejected() {
        let mut config = config();
        config.house_load_mw = -1.0;
        let err = config
            .validate(&Catalog::standard(), BoundsPolicy::Permissive)
            .unwrap_err();
        assert_eq!(err.field(), Some("house_load_mw"));
    }

    #[test]
    fn zero_total_load_is_rejected() {
        let config = ProjectConfiguration::new(0.0, 0.0, 0.0, Tier::TierI);
        let err = config
            .validate(&Catalog::standard(), BoundsPolicy::Permissive)
            .unwrap_err();
        assert_eq!(err.field(), Some("total_load_mw"));
    }

    #[test]
    fn zero_override_is_rejected() {
        let mut config = config();
        config.custom_bus_count = Some(0);
        let err = config
            .validate(&Catalog::standard(), BoundsPolicy::Permissive)
            .unwrap_err();
        assert_eq!(err.field(), Some("custom_bus_count"));
    }

    #[test]
    fn phase_wise_requires_phases() {
        let mut config = config();
        config.calculation_mode = CalculationMode::PhaseWise;
        let err = config
            .validate(&Catalog::standard(), BoundsPolicy::Permissive)
            .unwrap_err();
        assert_eq!(err.field(), Some("phases"));
    }

    #[test]
    fn strict_policy_checks_only_active_factors() {
        let catalog = Catalog::standard();
        let mut config = config();
        config.pricing.repeat_customer = DiscountToggle::disabled(0.1);
        config.validate(&catalog, BoundsPolicy::Strict).unwrap();

        config.pricing.repeat_customer.enabled = true;
        let err = config.validate(&catalog, BoundsPolicy::Strict).unwrap_err();
        assert_eq!(err.field(), Some("pricing.repeat_customer.factor"));
        config.validate(&catalog, BoundsPolicy::Permissive).unwrap();
    }

    #[test]
    fn additional_costs_break_down_by_line() {
        let costs = AdditionalCosts {
            labels: UnitCharge::new(50, 150.0),
            site_visits: UnitCharge::new(3, 8_000.0),
            meetings: UnitCharge::new(2, 2_500.0),
            miscellaneous: Some(MiscCharge {
                description: "Printing".into(),
                amount: 5_000.0,
            }),
        };
        let breakdown = costs.breakdown().unwrap();
        assert_eq!(breakdown.labels, 7_500.0);
        assert_eq!(breakdown.site_visits, 24_000.0);
        assert_eq!(breakdown.meetings, 5_000.0);
        assert_eq!(breakdown.total(), 41_500.0);
        assert_eq!(breakdown.miscellaneous_description.as_deref(), Some("Printing"));
    }

    #[test]
    fn empty_selection_is_flagged_on_request() {
        let config = ProjectConfiguration::new(1.0, 1.0, 1.0, Tier::TierI);
        assert!(matches!(
            config.ensure_selection(),
            Err(CalcEngineError::NothingSelected)
        ));
    }
}
