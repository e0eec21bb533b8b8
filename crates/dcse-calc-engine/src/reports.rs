//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::{
    fs::{self, OpenOptions},
    path::Path,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    errors::Result,
    model::{CalculationMode, ProjectConfiguration},
    Estimate,
};

/// Flat key/value snapshot of one calculation, ready for a delimited record.
///
/// Pure projection of an [`Estimate`]: nothing is recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    fields: IndexMap<&'static str, String>,
}

impl ExportRecord {
    pub fn project(
        estimate: &Estimate,
        config: &ProjectConfiguration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let summary = &estimate.summary;
        let studies = config
            .selected_studies
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let mode = match estimate.calculation_mode {
            CalculationMode::Consolidated => "consolidated",
            CalculationMode::PhaseWise => "phase_wise",
        };

        let mut fields = IndexMap::new();
        fields.insert("timestamp", timestamp.to_rfc3339());
        fields.insert("catalog", estimate.catalog.clone());
        fields.insert("it_load_mw", config.it_load_mw.to_string());
        fields.insert("mechanical_load_mw", config.mechanical_load_mw.to_string());
        fields.insert("house_load_mw", config.house_load_mw.to_string());
        fields.insert("total_load_mw", estimate.total_load_mw.to_string());
        fields.insert("tier", config.tier.to_string());
        fields.insert("delivery", config.delivery.to_string());
        fields.insert(
            "topology",
            config
                .topology
                .map(|topology| topology.to_string())
                .unwrap_or_default(),
        );
        fields.insert("report_format", config.report_format.to_string());
        fields.insert("calculation_mode", mode.to_owned());
        fields.insert("studies", studies);
        fields.insert("phases", estimate.phases.len().to_string());
        fields.insert("bus_count", estimate.buses.value.to_string());
        fields.insert(
            "bus_count_source",
            if estimate.buses.is_override() {
                "override".to_owned()
            } else {
                "derived".to_owned()
            },
        );
        fields.insert("total_hours", format!("{:.2}", estimate.total_hours));
        fields.insert("raw_total", format!("{:.2}", summary.raw_total));
        fields.insert("additional_costs", format!("{:.2}", summary.additional_total));
        fields.insert("standard_cost", format!("{:.2}", summary.standard_cost));
        fields.insert(
            "competitive_multiplier",
            format!("{:.4}", summary.competitive_multiplier),
        );
        fields.insert("competitive_cost", format!("{:.2}", summary.competitive_cost));
        fields.insert("savings", format!("{:.2}", summary.savings));
        fields.insert(
            "savings_percentage",
            format!("{:.2}", summary.savings_percentage),
        );

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }

    /// Append the record to a CSV file, writing the header row when the file
    /// is new or empty.
    pub fn append_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(self.headers())?;
        }
        writer.write_record(self.values())?;
        writer.flush()?;
        info!(path = %path.display(), "export record appended");
        Ok(())
    }
}

#[derive(Debug)]
pub struct ReportExporter<'a> {
    estimate: &'a Estimate,
}

impl<'a> ReportExporter<'a> {
    pub fn new(estimate: &'a Estimate) -> Self {
        Self { estimate }
    }

    pub fn export_all(&self, output_dir: &Path, timestamp: DateTime<Utc>) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = timestamp.to_rfc3339();
        let envelope = ReportEnvelope {
            timestamp: &timestamp,
            catalog: &self.estimate.catalog,
            schema: estimate_schema(),
            data: self.estimate,
        };
        write_json(output_dir.join("estimate.json"), &envelope)?;

        info!("Reports exported to {}", output_dir.display());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    catalog: &'a str,
    schema: serde_json::Value,
    data: &'a T,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn estimate_schema() -> serde_json::Value {
    let study = json!({
        "type": "object",
        "properties": {
            "kind": {"type": "string"},
            "name": {"type": "string"},
            "buses": {"type": "integer"},
            "hours": {"type": "number"},
            "labor_cost": {"type": "number"},
            "report_cost": {"type": "number"},
            "total_cost": {"type": "number"}
        },
        "required": ["kind", "hours", "labor_cost", "report_cost", "total_cost"]
    });
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Estimate",
        "type": "object",
        "properties": {
            "buses": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer", "minimum": 1},
                    "source": {"enum": ["derived", "override"]}
                },
                "required": ["value", "source"]
            },
            "total_load_mw": {"type": "number"},
            "studies": {"type": "array", "items": study.clone()},
            "phases": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "capacity_mw": {"type": "number"},
                        "buses": {"type": "integer"},
                        "studies": {"type": "array", "items": study},
                        "total_cost": {"type": "number"}
                    },
                    "required": ["name", "capacity_mw", "buses", "studies", "total_cost"]
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "standard_cost": {"type": "number"},
                    "competitive_cost": {"type": "number"},
                    "savings": {"type": "number"},
                    "savings_percentage": {"type": "number"}
                },
                "required": ["standard_cost", "competitive_cost", "savings", "savings_percentage"]
            }
        },
        "required": ["buses", "total_load_mw", "studies", "phases", "summary"]
    })
}
