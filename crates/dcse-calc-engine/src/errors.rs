//! ---
//! dcse_section: "02-calculation-engine"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Cost estimation routines for power-system study engagements."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("invalid configuration for `{field}`: {constraint}")]
    Configuration { field: String, constraint: String },
    #[error("no studies selected")]
    NothingSelected,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("toml deserialization error: {0}")]
    TomlDeserializationFailed(#[from] toml::de::Error),
    #[error("toml serialization error: {0}")]
    TomlSerializationFailed(#[from] toml::ser::Error),
    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

impl CalcEngineError {
    pub fn configuration(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        CalcEngineError::Configuration {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Name of the offending field for configuration errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            CalcEngineError::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Rejects negative, NaN and infinite factors. Zero is accepted.
pub(crate) fn ensure_non_negative(field: impl Into<String>, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CalcEngineError::configuration(
            field,
            format!("must be a finite non-negative number, got {value}"),
        ))
    }
}

/// Rejects zero, negative, NaN and infinite values.
pub(crate) fn ensure_positive(field: impl Into<String>, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CalcEngineError::configuration(
            field,
            format!("must be a finite positive number, got {value}"),
        ))
    }
}
