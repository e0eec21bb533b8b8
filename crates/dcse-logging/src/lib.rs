//! ---
//! dcse_section: "03-persistence-logging"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Structured logging adapters and sinks."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Estimation-aware logging context and macros.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Project or request label the event belongs to.
    pub project: Option<&'a str>,
    /// Phase name when running phase-wise.
    pub phase: Option<&'a str>,
    /// Study key, e.g. `arc_flash`.
    pub study: Option<&'a str>,
    /// Calculation mode (consolidated, phase_wise).
    pub mode: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a project label.
    pub fn with_project(mut self, project: &'a str) -> Self {
        self.project = Some(project);
        self
    }

    /// Attach a phase name.
    pub fn with_phase(mut self, phase: &'a str) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a study key.
    pub fn with_study(mut self, study: &'a str) -> Self {
        self.study = Some(study);
        self
    }

    /// Attach a calculation mode descriptor.
    pub fn with_mode(mut self, mode: &'a str) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Outcome attached to lifecycle events such as exports and profile changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed.
    Success,
    /// Nothing needed doing, e.g. resetting when no profile is active.
    Skipped,
    /// The operation failed and the command is about to return an error.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Skipped => "skipped",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a lifecycle event tagged with `event` and its outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing` needs a constant level per callsite.
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                project = ctx.project.unwrap_or(""),
                phase = ctx.phase.unwrap_or(""),
                study = ctx.study.unwrap_or(""),
                mode = ctx.mode.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Skipped => emit!(Level::WARN),
        SystemEventOutcome::Fault => emit!(Level::ERROR),
    }
}
