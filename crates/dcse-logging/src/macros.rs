//! ---
//! dcse_section: "03-persistence-logging"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Structured logging adapters and sinks."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
//! `dcse_*!` macros attaching a [`LogContext`](crate::LogContext) to tracing events.

#[doc(hidden)]
#[macro_export]
macro_rules! __dcse_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            project = ctx.project.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            study = ctx.study.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with estimation context.
#[macro_export]
macro_rules! dcse_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with estimation context.
#[macro_export]
macro_rules! dcse_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with estimation context.
#[macro_export]
macro_rules! dcse_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with estimation context.
#[macro_export]
macro_rules! dcse_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dcse_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
