//! ---
//! dcse_section: "01-core-functionality"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Shared primitives and utilities for the estimator runtime."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "DCSE_LOG";
const FALLBACK_DIRECTIVE: &str = "info";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDERR_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Pick the filter directive: `DCSE_LOG`, then `RUST_LOG`, then the configured level.
fn filter_directive(dcse_log: Option<String>, rust_log: Option<String>, configured: &str) -> String {
    [dcse_log, rust_log]
        .into_iter()
        .flatten()
        .map(|directive| directive.trim().to_owned())
        .find(|directive| !directive.is_empty())
        .unwrap_or_else(|| configured.to_owned())
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive '{directive}' ({err}); using {FALLBACK_DIRECTIVE}");
        EnvFilter::new(FALLBACK_DIRECTIVE)
    })
}

/// Install the estimator's tracing subscriber.
///
/// Console output goes to stderr so `--json` on stdout stays machine-readable.
/// With `logging.file` enabled a daily JSON log is also written under
/// `logging.directory`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        &config.level,
    );

    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = STDERR_GUARD.set(console_guard);
    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
    };

    let file_layer = if config.file {
        std::fs::create_dir_all(&config.directory)?;
        let prefix = config.file_prefix.as_deref().unwrap_or("dcse");
        let appender = daily(&config.directory, format!("{prefix}-{service_name}.log"));
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(file_guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(file_writer)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(build_filter(&directive))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        filter = %directive,
        log_file = config.file,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path, file: bool) -> LoggingConfig {
        LoggingConfig {
            directory: dir.join("logs"),
            format: LogFormat::StructuredJson,
            file_prefix: Some("test".into()),
            level: "debug".into(),
            file,
        }
    }

    #[test]
    fn dcse_log_takes_precedence() {
        let directive = filter_directive(
            Some("dcse_calc_engine=trace".into()),
            Some("warn".into()),
            "info",
        );
        assert_eq!(directive, "dcse_calc_engine=trace");
    }

    #[test]
    fn blank_variables_fall_through_to_configured_level() {
        assert_eq!(filter_directive(Some("  ".into()), None, "debug"), "debug");
        assert_eq!(filter_directive(None, Some("warn".into()), "debug"), "warn");
    }

    #[test]
    fn file_sink_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), true);
        init_tracing("dcse-common", &config).unwrap();
        init_tracing("dcse-common", &config).unwrap();
        assert!(config.directory.is_dir());
    }

    #[test]
    fn console_only_leaves_directory_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), false);
        init_tracing("dcse-common", &config).unwrap();
        assert!(!config.directory.exists());
    }
}
