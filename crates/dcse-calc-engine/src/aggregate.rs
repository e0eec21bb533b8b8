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
use tracing::info;

use crate::{
    errors::{ensure_non_negative, Result},
    phases::PhaseResult,
    study::StudyResult,
};

/// Commercial adjustments applied to the raw study total.
///
/// Each factor is already resolved for the project: toggled-off adjustments
/// carry the identity value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub premium_factor: f64,
    pub phase_extension_discount: f64,
    pub client_multiplier: f64,
    pub similar_model_discount: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            premium_factor: 1.0,
            phase_extension_discount: 1.0,
            client_multiplier: 1.0,
            similar_model_discount: 1.0,
        }
    }
}

impl Adjustments {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("adjustments.premium_factor", self.premium_factor)?;
        ensure_non_negative(
            "adjustments.phase_extension_discount",
            self.phase_extension_discount,
        )?;
        ensure_non_negative("adjustments.client_multiplier", self.client_multiplier)?;
        ensure_non_negative(
            "adjustments.similar_model_discount",
            self.similar_model_discount,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveFactor {
    pub label: String,
    pub factor: f64,
}

/// Ordered discount factors whose product turns the standard cost into the
/// competitive cost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompetitiveChain {
    pub factors: Vec<CompetitiveFactor>,
}

impl CompetitiveChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, factor: f64) -> Self {
        self.factors.push(CompetitiveFactor {
            label: label.into(),
            factor,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (index, factor) in self.factors.iter().enumerate() {
            ensure_non_negative(
                format!("competitive_chain[{index}] ({})", factor.label),
                factor.factor,
            )?;
        }
        Ok(())
    }

    /// Product of every factor; the empty chain is the identity.
    pub fn multiplier(&self) -> f64 {
        self.factors.iter().map(|factor| factor.factor).product()
    }
}

/// Flat charges added on top of the study total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdditionalCostBreakdown {
    pub labels: f64,
    pub site_visits: f64,
    pub meetings: f64,
    pub miscellaneous: f64,
    #[serde(default)]
    pub miscellaneous_description: Option<String>,
}

impl AdditionalCostBreakdown {
    pub fn total(&self) -> f64 {
        self.labels + self.site_visits + self.meetings + self.miscellaneous
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("additional_costs.labels", self.labels)?;
        ensure_non_negative("additional_costs.site_visits", self.site_visits)?;
        ensure_non_negative("additional_costs.meetings", self.meetings)?;
        ensure_non_negative("additional_costs.miscellaneous", self.miscellaneous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Sum of study (or phase) totals before any adjustment.
    pub raw_total: f64,
    pub additional: AdditionalCostBreakdown,
    pub additional_total: f64,
    pub standard_cost: f64,
    pub competitive_multiplier: f64,
    pub competitive_cost: f64,
    pub savings: f64,
    pub savings_percentage: f64,
}

/// Fold study or phase totals into standard and competitive pricing.
///
/// When `phase_results` is present the raw total is the sum of phase totals
/// and `study_results` is ignored. Additional costs are added before the
/// phase-extension, client and similar-model factors, so those factors also
/// scale the flat charges.
pub fn aggregate(
    study_results: &[StudyResult],
    phase_results: Option<&[PhaseResult]>,
    adjustments: &Adjustments,
    additional: AdditionalCostBreakdown,
    chain: &CompetitiveChain,
) -> Result<CostSummary> {
    adjustments.validate()?;
    additional.validate()?;
    chain.validate()?;

    let raw_total: f64 = match phase_results {
        Some(phases) => phases.iter().map(|phase| phase.total_cost).sum(),
        None => study_results.iter().map(|study| study.total_cost).sum(),
    };
    let additional_total = additional.total();

    let mut standard_cost = raw_total * adjustments.premium_factor;
    standard_cost += additional_total;
    standard_cost *= adjustments.phase_extension_discount;
    standard_cost *= adjustments.client_multiplier * adjustments.similar_model_discount;

    let competitive_multiplier = chain.multiplier();
    let competitive_cost = standard_cost * competitive_multiplier;
    let savings = standard_cost - competitive_cost;
    let savings_percentage = if standard_cost > 0.0 {
        savings / standard_cost * 100.0
    } else {
        0.0
    };

    info!(
        raw_total,
        standard_cost, competitive_cost, savings_percentage, "pricing aggregated"
    );

    Ok(CostSummary {
        raw_total,
        additional,
        additional_total,
        standard_cost,
        competitive_multiplier,
        competitive_cost,
        savings,
        savings_percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{allocation::LevelHours, catalog::StudyKind};

    fn study(total_cost: f64) -> StudyResult {
        StudyResult {
            kind: StudyKind::LoadFlow,
            name: "Load Flow Study".into(),
            complexity: "Medium".into(),
            buses: 1,
            hours: 0.0,
            level_hours: LevelHours::default(),
            labor_cost: total_cost,
            report_cost: 0.0,
            total_cost,
        }
    }

    fn phase(total_cost: f64) -> PhaseResult {
        PhaseResult {
            name: "Phase".into(),
            capacity_mw: 1.0,
            buses: 2,
            studies: Vec::new(),
            total_hours: 0.0,
            total_cost,
        }
    }

    #[test]
    fn identity_chain_leaves_standard_cost() {
        let summary = aggregate(
            &[study(100.0), study(50.0)],
            None,
            &Adjustments::default(),
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new().with("overall", 1.0),
        )
        .unwrap();
        assert_eq!(summary.standard_cost, 150.0);
        assert_eq!(summary.competitive_cost, summary.standard_cost);
        assert_eq!(summary.savings, 0.0);
        assert_eq!(summary.savings_percentage, 0.0);
    }

    #[test]
    fn additional_costs_are_discounted_with_the_rest() {
        let additional = AdditionalCostBreakdown {
            site_visits: 24_000.0,
            ..AdditionalCostBreakdown::default()
        };
        let adjustments = Adjustments {
            premium_factor: 1.5,
            phase_extension_discount: 0.5,
            ..Adjustments::default()
        };
        let summary = aggregate(
            &[study(1_000.0)],
            None,
            &adjustments,
            additional,
            &CompetitiveChain::new(),
        )
        .unwrap();
        // (1000 × 1.5 + 24000) × 0.5
        assert!((summary.standard_cost - 12_750.0).abs() < 1e-9);
        assert_eq!(summary.additional_total, 24_000.0);
    }

    #[test]
    fn phases_replace_study_totals() {
        let summary = aggregate(
            &[study(1.0e9)],
            Some(&[phase(300.0), phase(700.0)]),
            &Adjustments::default(),
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new().with("historical", 0.85).with("overall", 0.88),
        )
        .unwrap();
        assert_eq!(summary.raw_total, 1_000.0);
        assert!((summary.competitive_multiplier - 0.748).abs() < 1e-12);
        assert!((summary.savings_percentage - 25.2).abs() < 1e-9);
    }

    #[test]
    fn zero_standard_cost_has_zero_savings_percentage() {
        let summary = aggregate(
            &[],
            None,
            &Adjustments::default(),
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new().with("overall", 0.5),
        )
        .unwrap();
        assert_eq!(summary.standard_cost, 0.0);
        assert_eq!(summary.savings_percentage, 0.0);
    }

    #[test]
    fn factors_above_one_are_accepted() {
        let summary = aggregate(
            &[study(100.0)],
            None,
            &Adjustments::default(),
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new().with("overall", 1.2),
        )
        .unwrap();
        assert!(summary.competitive_cost > summary.standard_cost);
        assert!(summary.savings < 0.0);
    }

    #[test]
    fn negative_factors_are_rejected() {
        let err = aggregate(
            &[study(100.0)],
            None,
            &Adjustments {
                client_multiplier: -0.1,
                ..Adjustments::default()
            },
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("adjustments.client_multiplier"));

        let err = aggregate(
            &[study(100.0)],
            None,
            &Adjustments::default(),
            AdditionalCostBreakdown::default(),
            &CompetitiveChain::new().with("repeat customer", -0.5),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("competitive_chain[0] (repeat customer)"));
    }
}
