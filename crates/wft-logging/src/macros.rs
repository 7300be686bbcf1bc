//! ---
//! wft_section: "03-persistence-logging"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Structured logging adapters and sinks."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
/// Emit an informational log enriched with stage context.
#[macro_export]
macro_rules! twin_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with stage context.
#[macro_export]
macro_rules! twin_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning enriched with stage context.
#[macro_export]
macro_rules! twin_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
