//! ---
//! dcse_section: "01-core-functionality"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Shared primitives and utilities for the estimator runtime."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
//! Shared primitives for the DCSE workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the CLI and the profile tooling.

pub mod config;
pub mod logging;

pub use config::{AppConfig, CalibrationConfig, EngineConfig, ExportConfig, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
