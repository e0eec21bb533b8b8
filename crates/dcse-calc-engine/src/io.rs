//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::{fs, path::Path};

use crate::{
    catalog::Catalog,
    errors::{CalcEngineError, Result},
    model::ProjectConfiguration,
};

/// Read a request from JSON (when the document opens with `{`) or YAML.
pub fn load_configuration_from_file(path: impl AsRef<Path>) -> Result<ProjectConfiguration> {
    let data = fs::read_to_string(path)?;
    parse_configuration(&data)
}

pub fn parse_configuration(data: &str) -> Result<ProjectConfiguration> {
    let config = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(CalcEngineError::YamlSerializationFailed)?
    };
    Ok(config)
}

/// Read a TOML catalog override and check its invariants.
pub fn load_catalog_from_file(path: impl AsRef<Path>) -> Result<Catalog> {
    let data = fs::read_to_string(path)?;
    let catalog: Catalog = toml::from_str(&data)?;
    catalog.validate()?;
    Ok(catalog)
}

/// TOML form accepted back by [`load_catalog_from_file`].
pub fn catalog_to_toml(catalog: &Catalog) -> Result<String> {
    Ok(toml::to_string_pretty(catalog)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StudyKind, Tier};

    #[test]
    fn json_and_yaml_requests_agree() {
        let json = r#"{"it_load_mw": 15.0, "mechanical_load_mw": 10.0, "house_load_mw": 5.0,
                      "tier": "tier_ii", "selected_studies": ["arc_flash"]}"#;
        let yaml = "it_load_mw: 15.0\nmechanical_load_mw: 10.0\nhouse_load_mw: 5.0\ntier: tier_ii\nselected_studies: [arc_flash]\n";
        let from_json = parse_configuration(json).unwrap();
        let from_yaml = parse_configuration(yaml).unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json.tier, Tier::TierII);
        assert!(from_json.selected_studies.contains(&StudyKind::ArcFlash));
    }

    #[test]
    fn unknown_tier_fails_to_parse() {
        let err = parse_configuration("tier: tier_v\nit_load_mw: 1.0\n").unwrap_err();
        assert!(matches!(err, CalcEngineError::YamlSerializationFailed(_)));
    }

    #[test]
    fn catalog_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        let mut catalog = Catalog::standard();
        catalog.tier_bus_multiplier.tier_iv = 1.0;
        fs::write(&path, catalog_to_toml(&catalog).unwrap()).unwrap();

        let err = load_catalog_from_file(&path).unwrap_err();
        assert_eq!(err.field(), Some("catalog.tier_bus_multiplier"));
    }
}
