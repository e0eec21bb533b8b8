//! ---
//! dcse_section: "01-core-functionality"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Shared primitives and utilities for the estimator runtime."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use dcse_calc_engine::{
    catalog::{BoundsPolicy, Catalog, CatalogPreset},
    io::load_catalog_from_file,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_export_directory() -> PathBuf {
    PathBuf::from("target/exports")
}

fn default_csv_file() -> String {
    "estimates.csv".to_owned()
}

fn default_profile_root() -> PathBuf {
    PathBuf::from("target/calibration")
}

/// Primary configuration object for DCSE tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "DCSE_CONFIG";

    /// Load configuration, respecting the `DCSE_CONFIG` override and falling
    /// back to defaults when no candidate exists.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.export.csv_file.trim().is_empty() {
            return Err(anyhow!("export.csv_file cannot be empty"));
        }
        if let Some(path) = &self.engine.catalog_file {
            if !path.is_file() {
                return Err(anyhow!(
                    "engine.catalog_file {} does not exist or is not a file",
                    path.display()
                ));
            }
        }
        Ok(())
    }

    /// Full path of the CSV file estimates are appended to.
    pub fn csv_path(&self) -> PathBuf {
        self.export.directory.join(&self.export.csv_file)
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Filter directive used when neither `DCSE_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write the daily JSON log file next to console output.
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            level: default_log_level(),
            file: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_true() -> bool {
    true
}

/// Which constants the engine runs against and how strictly factors are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog: CatalogPreset,
    /// TOML catalog replacing the preset entirely.
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    #[serde(default)]
    pub bounds_policy: BoundsPolicy,
}

impl EngineConfig {
    /// Resolve the effective catalog: an explicit override file wins over the
    /// configured override, which wins over the preset.
    pub fn resolve_catalog(&self, override_file: Option<&Path>) -> Result<Catalog> {
        match override_file.or(self.catalog_file.as_deref()) {
            Some(path) => load_catalog_from_file(path)
                .with_context(|| format!("failed to load catalog {}", path.display())),
            None => Ok(self.catalog.catalog()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_csv_file")]
    pub csv_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            csv_file: default_csv_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_profile_root")]
    pub profile_root: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            profile_root: default_profile_root(),
        }
    }
}
