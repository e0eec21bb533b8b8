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

use crate::errors::{ensure_non_negative, CalcEngineError, Result};

fn default_senior_share() -> f64 {
    0.20
}

fn default_mid_share() -> f64 {
    0.30
}

fn default_junior_share() -> f64 {
    0.50
}

fn default_senior_rate() -> f64 {
    1200.0
}

fn default_mid_rate() -> f64 {
    750.0
}

fn default_junior_rate() -> f64 {
    500.0
}

/// Share of effort carried by each proficiency level.
///
/// Values need not sum to one; [`ResourceSplit::normalized`] rescales them
/// while preserving their proportions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSplit {
    #[serde(default = "default_senior_share", alias = "l1")]
    pub senior: f64,
    #[serde(default = "default_mid_share", alias = "l2")]
    pub mid: f64,
    #[serde(default = "default_junior_share", alias = "l3")]
    pub junior: f64,
}

impl Default for ResourceSplit {
    fn default() -> Self {
        Self {
            senior: default_senior_share(),
            mid: default_mid_share(),
            junior: default_junior_share(),
        }
    }
}

impl ResourceSplit {
    pub fn new(senior: f64, mid: f64, junior: f64) -> Self {
        Self {
            senior,
            mid,
            junior,
        }
    }

    pub fn sum(&self) -> f64 {
        self.senior + self.mid + self.junior
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("resource_split.senior", self.senior)?;
        ensure_non_negative("resource_split.mid", self.mid)?;
        ensure_non_negative("resource_split.junior", self.junior)?;
        let sum = self.sum();
        if !sum.is_finite() {
            return Err(CalcEngineError::configuration(
                "resource_split",
                "shares must sum to a finite value",
            ));
        }
        if sum <= 0.0 {
            return Err(CalcEngineError::configuration(
                "resource_split",
                "shares must not all be zero",
            ));
        }
        Ok(())
    }

    /// Rescale the shares so they sum to one.
    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        let sum = self.sum();
        Ok(Self {
            senior: self.senior / sum,
            mid: self.mid / sum,
            junior: self.junior / sum,
        })
    }
}

/// Hours attributed to each proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelHours {
    pub senior: f64,
    pub mid: f64,
    pub junior: f64,
}

impl LevelHours {
    pub fn total(&self) -> f64 {
        self.senior + self.mid + self.junior
    }
}

/// Split `hours` across the three levels using the normalized `split`.
pub fn allocate(hours: f64, split: &ResourceSplit) -> Result<LevelHours> {
    ensure_non_negative("hours", hours)?;
    let shares = split.normalized()?;
    Ok(LevelHours {
        senior: hours * shares.senior,
        mid: hours * shares.mid,
        junior: hours * shares.junior,
    })
}

/// Hourly rates per proficiency level (currency per hour).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaborRates {
    #[serde(default = "default_senior_rate", alias = "l1")]
    pub senior: f64,
    #[serde(default = "default_mid_rate", alias = "l2")]
    pub mid: f64,
    #[serde(default = "default_junior_rate", alias = "l3")]
    pub junior: f64,
}

impl Default for LaborRates {
    fn default() -> Self {
        Self {
            senior: default_senior_rate(),
            mid: default_mid_rate(),
            junior: default_junior_rate(),
        }
    }
}

impl LaborRates {
    pub fn new(senior: f64, mid: f64, junior: f64) -> Self {
        Self {
            senior,
            mid,
            junior,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("rates.senior", self.senior)?;
        ensure_non_negative("rates.mid", self.mid)?;
        ensure_non_negative("rates.junior", self.junior)
    }

    pub fn labor_cost(&self, hours: &LevelHours) -> f64 {
        hours.senior * self.senior + hours.mid * self.mid + hours.junior * self.junior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_normalized() {
        let split = ResourceSplit::new(20.0, 30.0, 50.0).normalized().unwrap();
        assert!((split.senior - 0.2).abs() < 1e-12);
        assert!((split.mid - 0.3).abs() < 1e-12);
        assert!((split.junior - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_sum_split_is_rejected() {
        let err = allocate(10.0, &ResourceSplit::new(0.0, 0.0, 0.0)).unwrap_err();
        assert_eq!(err.field(), Some("resource_split"));
    }

    #[test]
    fn overflowing_split_is_rejected() {
        let split = ResourceSplit::new(f64::MAX, f64::MAX, 0.0);
        let err = allocate(65.52, &split).unwrap_err();
        assert_eq!(err.field(), Some("resource_split"));
    }

    #[test]
    fn negative_share_is_rejected() {
        let err = ResourceSplit::new(0.5, -0.1, 0.6).normalized().unwrap_err();
        assert_eq!(err.field(), Some("resource_split.mid"));
    }

    #[test]
    fn allocation_preserves_total_hours() {
        let hours = allocate(65.52, &ResourceSplit::default()).unwrap();
        assert!((hours.total() - 65.52).abs() < 1e-9);
        assert!((hours.senior - 13.104).abs() < 1e-9);
    }

    #[test]
    fn zero_hours_allocate_to_zero() {
        let hours = allocate(0.0, &ResourceSplit::default()).unwrap();
        assert_eq!(hours, LevelHours::default());
    }

    #[test]
    fn blended_rate_matches_default_mix() {
        let hours = allocate(1.0, &ResourceSplit::default()).unwrap();
        let cost = LaborRates::default().labor_cost(&hours);
        assert!((cost - 715.0).abs() < 1e-9);
    }
}
