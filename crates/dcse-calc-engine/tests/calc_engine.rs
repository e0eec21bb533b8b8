//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::{fs, sync::Arc};

use chrono::{TimeZone, Utc};
use dcse_calc_engine::{
    allocation::ResourceSplit,
    calibration::{CalibrationSnapshot, CalibrationStore},
    catalog::{BoundsPolicy, Catalog, StudyKind, Tier, Topology},
    estimate, estimate_with_policy,
    model::{
        AdditionalCosts, CalculationMode, ClientType, DiscountToggle, MiscCharge,
        PricingFactors, ProjectConfiguration, ProjectType, UnitCharge,
    },
    phases::PhaseSpec,
    reports::ExportRecord,
    CalcEngineError, Estimator,
};
use tempfile::tempdir;

fn reference_project() -> ProjectConfiguration {
    let mut config = ProjectConfiguration::new(15.0, 10.0, 5.0, Tier::TierIII)
        .with_studies([StudyKind::LoadFlow, StudyKind::ShortCircuit]);
    config.topology = Some(Topology::Radial);
    config.resource_split = ResourceSplit::new(20.0, 30.0, 50.0);
    config.pricing = PricingFactors::neutral();
    config
}

#[test]
fn reference_project_prices_both_studies() {
    let estimate = estimate(
        &reference_project(),
        &Catalog::standard(),
        &CalibrationSnapshot::identity(),
    )
    .expect("estimate");

    assert_eq!(estimate.buses.value, 63);
    assert!(!estimate.buses.is_override());

    let load_flow = &estimate.studies[0];
    let short_circuit = &estimate.studies[1];
    assert_eq!(load_flow.kind, StudyKind::LoadFlow);
    assert!((load_flow.total_cost - 64_846.8).abs() < 1e-6);
    assert!((short_circuit.hours - 81.9).abs() < 1e-9);
    assert!((short_circuit.total_cost - 80_558.5).abs() < 1e-6);

    let summary = &estimate.summary;
    assert!((summary.standard_cost - 145_405.3).abs() < 1e-6);
    assert!((summary.competitive_cost - summary.standard_cost).abs() < 1e-9);
    assert_eq!(summary.savings_percentage, 0.0);
}

#[test]
fn default_commercial_settings_discount_competitive_view() {
    let mut config = reference_project();
    config.pricing = PricingFactors::default();
    config.pricing.historical_model = DiscountToggle::enabled(0.85);
    config.client_type = ClientType::Premium;

    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");
    let summary = &estimate.summary;

    assert!((summary.standard_cost - 145_405.3 * 1.3).abs() < 1e-6);
    assert!((summary.competitive_multiplier - 0.85 * 0.88).abs() < 1e-12);
    assert!((summary.savings_percentage - 25.2).abs() < 1e-9);
    for line in &estimate.pricing_lines {
        assert!(line.competitive_cost <= line.standard_cost);
    }
}

#[test]
fn additional_costs_ride_along_with_phase_extension() {
    let mut config = reference_project();
    config.project_type = ProjectType::PhaseExtension;
    config.pricing.phase_extension_discount = 0.9;
    config.additional_costs = AdditionalCosts {
        labels: UnitCharge::new(50, 150.0),
        site_visits: UnitCharge::new(3, 8_000.0),
        meetings: UnitCharge::new(2, 2_500.0),
        miscellaneous: Some(MiscCharge {
            description: "Travel".into(),
            amount: 5_000.0,
        }),
    };

    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");
    let summary = &estimate.summary;

    assert_eq!(summary.additional_total, 41_500.0);
    assert!((summary.standard_cost - (145_405.3 + 41_500.0) * 0.9).abs() < 1e-6);
}

#[test]
fn override_replaces_derived_bus_count() {
    let mut config = reference_project();
    config.custom_bus_count = Some(40);

    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");
    assert_eq!(estimate.buses.value, 40);
    assert!(estimate.buses.is_override());
    assert!(estimate.studies.iter().all(|study| study.buses == 40));
}

#[test]
fn phase_wise_mode_sizes_each_phase_and_ignores_override() {
    let mut config = reference_project();
    config.calculation_mode = CalculationMode::PhaseWise;
    config.custom_bus_count = Some(500);
    config.phases = vec![PhaseSpec::new("Hall A", 10.0), PhaseSpec::new("Hall B", 20.0)];

    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");

    assert!(estimate.studies.is_empty());
    // ceil(10 × 2.1) and ceil(20 × 2.1)
    assert_eq!(estimate.phases[0].buses, 21);
    assert_eq!(estimate.phases[1].buses, 42);
    for phase in &estimate.phases {
        assert_eq!(phase.studies.len(), 2);
        let sum: f64 = phase.studies.iter().map(|study| study.total_cost).sum();
        assert!((phase.total_cost - sum).abs() < 1e-9);
    }

    // Each phase carries its own report fee, so splitting costs more.
    let consolidated = estimate_with_policy(
        &reference_project(),
        &Catalog::standard(),
        &CalibrationSnapshot::identity(),
        BoundsPolicy::Permissive,
    )
    .expect("consolidated");
    assert!(estimate.summary.raw_total > consolidated.summary.raw_total);
}

#[test]
fn empty_selection_prices_additional_costs_only() {
    let mut config = ProjectConfiguration::new(5.0, 3.0, 2.0, Tier::TierII);
    config.additional_costs.site_visits = UnitCharge::new(2, 6_000.0);

    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");

    assert!(estimate.studies.is_empty());
    assert_eq!(estimate.summary.raw_total, 0.0);
    assert_eq!(estimate.summary.standard_cost, 12_000.0);
    assert!((estimate.summary.competitive_cost - 12_000.0 * 0.88).abs() < 1e-9);
    assert!(matches!(
        config.ensure_selection(),
        Err(CalcEngineError::NothingSelected)
    ));
}

#[test]
fn repeated_runs_are_identical() {
    let config = reference_project();
    let catalog = Catalog::market_recalibrated();
    let calibration = CalibrationSnapshot::identity().with_study(StudyKind::LoadFlow, 1.1);

    let first = estimate(&config, &catalog, &calibration).expect("first");
    let second = estimate(&config, &catalog, &calibration).expect("second");
    assert_eq!(first, second);
    assert_eq!(first.catalog, "market_recalibrated");
}

#[test]
fn strict_policy_rejects_out_of_range_active_factor() {
    let mut config = reference_project();
    config.pricing.overall_competitive_factor = 0.5;

    estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("permissive accepts");
    let err = estimate_with_policy(
        &config,
        &Catalog::standard(),
        &CalibrationSnapshot::identity(),
        BoundsPolicy::Strict,
    )
    .unwrap_err();
    assert_eq!(err.field(), Some("pricing.overall_competitive_factor"));
}

#[test]
fn exports_csv_record_and_json_report() {
    let config = reference_project();
    let estimate = estimate(&config, &Catalog::standard(), &CalibrationSnapshot::identity())
        .expect("estimate");
    let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();

    let record = ExportRecord::project(&estimate, &config, timestamp);
    assert_eq!(record.get("bus_count"), Some("63"));
    assert_eq!(record.get("studies"), Some("load_flow;short_circuit"));
    assert_eq!(record.get("standard_cost"), Some("145405.30"));

    let dir = tempdir().expect("tempdir");
    let csv_path = dir.path().join("exports").join("estimates.csv");
    record.append_csv(&csv_path).expect("first append");
    record.append_csv(&csv_path).expect("second append");
    let contents = fs::read_to_string(&csv_path).expect("csv");
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("timestamp,catalog,it_load_mw"));

    let report_dir = dir.path().join("report");
    estimate
        .exporter()
        .export_all(&report_dir, timestamp)
        .expect("report");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_dir.join("estimate.json")).unwrap())
            .unwrap();
    assert_eq!(json["catalog"], "standard");
    assert_eq!(json["data"]["buses"]["value"], 63);
    assert_eq!(json["data"]["buses"]["source"], "derived");
    assert!(json["schema"]["properties"]["summary"].is_object());
}

#[test]
fn estimator_snapshot_is_shared_across_clones() {
    let store = Arc::new(CalibrationStore::default());
    let estimator = Estimator::new(Catalog::standard())
        .expect("estimator")
        .with_calibration(Arc::clone(&store));
    let worker = estimator.clone();

    store
        .publish(CalibrationSnapshot::identity().with_study(StudyKind::ShortCircuit, 0.5))
        .expect("publish");
    let estimate = worker.run(&reference_project()).expect("estimate");
    assert!((estimate.studies[1].hours - 81.9 * 0.5).abs() < 1e-9);
    assert!((estimate.studies[0].hours - 65.52).abs() < 1e-9);

    assert!(store.publish(CalibrationSnapshot::identity().with_global(-1.0)).is_err());
    assert_eq!(store.snapshot().studies.get(StudyKind::ShortCircuit), 0.5);
}

#[test]
fn estimator_rejects_invalid_catalog() {
    let mut catalog = Catalog::standard();
    catalog.tier_bus_multiplier.tier_ii = 1.2;
    let err = Estimator::new(catalog).unwrap_err();
    assert_eq!(err.field(), Some("catalog.tier_bus_multiplier"));
}
