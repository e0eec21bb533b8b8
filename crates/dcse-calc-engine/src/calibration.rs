//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
//! Operator calibration factors.
//!
//! A [`CalibrationSnapshot`] is immutable and handed to each calculation.
//! Operators adjust calibration through a [`CalibrationStore`], which
//! publishes the next snapshot without disturbing calculations already
//! holding the previous one.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::info;

use crate::{
    catalog::StudyKind,
    errors::{ensure_non_negative, Result},
};

fn unity() -> f64 {
    1.0
}

/// Per-study calibration multipliers, identity by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudyFactors {
    #[serde(default = "unity")]
    pub load_flow: f64,
    #[serde(default = "unity")]
    pub short_circuit: f64,
    #[serde(default = "unity")]
    pub pdc: f64,
    #[serde(default = "unity")]
    pub arc_flash: f64,
    #[serde(default = "unity")]
    pub harmonics: f64,
    #[serde(default = "unity")]
    pub transients: f64,
}

impl Default for StudyFactors {
    fn default() -> Self {
        Self {
            load_flow: 1.0,
            short_circuit: 1.0,
            pdc: 1.0,
            arc_flash: 1.0,
            harmonics: 1.0,
            transients: 1.0,
        }
    }
}

impl StudyFactors {
    pub fn get(&self, kind: StudyKind) -> f64 {
        match kind {
            StudyKind::LoadFlow => self.load_flow,
            StudyKind::ShortCircuit => self.short_circuit,
            StudyKind::ProtectiveDeviceCoordination => self.pdc,
            StudyKind::ArcFlash => self.arc_flash,
            StudyKind::Harmonics => self.harmonics,
            StudyKind::Transients => self.transients,
        }
    }

    fn slot(&mut self, kind: StudyKind) -> &mut f64 {
        match kind {
            StudyKind::LoadFlow => &mut self.load_flow,
            StudyKind::ShortCircuit => &mut self.short_circuit,
            StudyKind::ProtectiveDeviceCoordination => &mut self.pdc,
            StudyKind::ArcFlash => &mut self.arc_flash,
            StudyKind::Harmonics => &mut self.harmonics,
            StudyKind::Transients => &mut self.transients,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    /// Multiplier applied to every study.
    #[serde(default = "unity")]
    pub global: f64,
    #[serde(default)]
    pub studies: StudyFactors,
}

impl Default for CalibrationSnapshot {
    fn default() -> Self {
        Self::identity()
    }
}

impl CalibrationSnapshot {
    pub fn identity() -> Self {
        Self {
            global: 1.0,
            studies: StudyFactors::default(),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Effective calibration factor for one study.
    pub fn factor_for(&self, kind: StudyKind) -> f64 {
        self.global * self.studies.get(kind)
    }

    pub fn with_global(mut self, factor: f64) -> Self {
        self.global = factor;
        self
    }

    pub fn with_study(mut self, kind: StudyKind, factor: f64) -> Self {
        *self.studies.slot(kind) = factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("calibration.global", self.global)?;
        for kind in StudyKind::iter() {
            ensure_non_negative(format!("calibration.studies.{kind}"), self.studies.get(kind))?;
        }
        Ok(())
    }
}

/// Shared holder of the current calibration snapshot.
#[derive(Debug, Default)]
pub struct CalibrationStore {
    current: RwLock<Arc<CalibrationSnapshot>>,
}

impl CalibrationStore {
    pub fn new(initial: CalibrationSnapshot) -> Result<Self> {
        initial.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(initial)),
        })
    }

    /// Consistent view for the duration of one calculation.
    pub fn snapshot(&self) -> Arc<CalibrationSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current snapshot. Invalid snapshots leave the store untouched.
    pub fn publish(&self, next: CalibrationSnapshot) -> Result<Arc<CalibrationSnapshot>> {
        next.validate()?;
        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);
        info!(global = next.global, "calibration snapshot published");
        Ok(next)
    }

    /// Derive the next snapshot from the current one and publish it.
    ///
    /// The write lock is held while `edit` runs, so concurrent updates
    /// serialize instead of overwriting each other.
    pub fn update<F>(&self, edit: F) -> Result<Arc<CalibrationSnapshot>>
    where
        F: FnOnce(CalibrationSnapshot) -> CalibrationSnapshot,
    {
        let mut current = self.current.write();
        let next = edit(**current);
        next.validate()?;
        let next = Arc::new(next);
        *current = Arc::clone(&next);
        info!(global = next.global, "calibration snapshot updated");
        Ok(next)
    }

    /// Return every factor to identity.
    pub fn reset(&self) -> Arc<CalibrationSnapshot> {
        let identity = Arc::new(CalibrationSnapshot::identity());
        *self.current.write() = Arc::clone(&identity);
        info!("calibration reset to identity");
        identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_compose_global_and_study() {
        let snapshot = CalibrationSnapshot::identity()
            .with_global(1.1)
            .with_study(StudyKind::ArcFlash, 0.5);
        assert!((snapshot.factor_for(StudyKind::ArcFlash) - 0.55).abs() < 1e-12);
        assert!((snapshot.factor_for(StudyKind::LoadFlow) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn held_snapshot_survives_publish() {
        let store = CalibrationStore::default();
        let before = store.snapshot();
        store
            .update(|snapshot| snapshot.with_global(1.25))
            .unwrap();
        assert!(before.is_identity());
        assert_eq!(store.snapshot().global, 1.25);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = CalibrationStore::default();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        store
                            .update(|snapshot| snapshot.with_global(snapshot.global + 1.0))
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(store.snapshot().global, 201.0);
    }

    #[test]
    fn invalid_publish_keeps_previous_snapshot() {
        let store = CalibrationStore::default();
        let err = store
            .publish(CalibrationSnapshot::identity().with_study(StudyKind::Harmonics, -1.0))
            .unwrap_err();
        assert_eq!(err.field(), Some("calibration.studies.harmonics"));
        assert!(store.snapshot().is_identity());
    }

    #[test]
    fn reset_restores_identity() {
        let store = CalibrationStore::new(CalibrationSnapshot::identity().with_global(0.9)).unwrap();
        store.reset();
        assert!(store.snapshot().is_identity());
    }

    #[test]
    fn partial_toml_fills_identity() {
        let snapshot: CalibrationSnapshot = toml::from_str(
            r#"
            global = 1.05
            [studies]
            pdc = 1.2
            "#,
        )
        .unwrap();
        assert_eq!(snapshot.studies.load_flow, 1.0);
        assert_eq!(snapshot.studies.pdc, 1.2);
    }
}
