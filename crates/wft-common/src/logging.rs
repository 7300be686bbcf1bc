//! ---
//! wft_section: "01-core-functionality"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared primitives and utilities for the twin workspace."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "WFT_LOG";

/// Crates whose events land in the audit file regardless of the console filter.
pub const AUDIT_TARGETS: [&str; 5] = [
    "wft_logging",
    "wft_pipeline",
    "wft_persistence",
    "wft_sim",
    "wft_twinctl",
];

static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Console filter for an optional `WFT_LOG` directive.
///
/// An invalid directive falls back to `info`; no directive defers to `RUST_LOG`.
pub fn console_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to info logging");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Debug-level filter for the twin crates; everything else is dropped.
pub fn audit_filter() -> Targets {
    Targets::new().with_targets(AUDIT_TARGETS.map(|target| (target, LevelFilter::DEBUG)))
}

/// Rolling audit file name for a service.
pub fn audit_file_name(service_name: &str) -> String {
    format!("{service_name}.audit.log")
}

/// Initialize console and audit logging.
///
/// * The console honours `WFT_LOG`, then `RUST_LOG`, then `info`, and renders
///   in [`LoggingConfig::format`].
/// * A daily rolling JSON file under [`LoggingConfig::directory`] records
///   [`AUDIT_TARGETS`] at debug level with the stage, run, farm and bucket
///   fields flattened into each line.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let file_appender = daily(&config.directory, audit_file_name(service_name));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = GUARDS.set([file_guard, stdout_guard]);

    let directive = std::env::var(LOG_ENV).ok();
    let console = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .with_filter(console_filter(directive.as_deref()))
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .with_filter(console_filter(directive.as_deref()))
            .boxed(),
    };
    let audit = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(file_writer)
        .with_filter(audit_filter())
        .boxed();

    let layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![console, audit];
    tracing_subscriber::registry().with(layers).try_init().ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let filter = console_filter(Some("wft_pipeline=loudest"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn valid_directive_is_kept() {
        let filter = console_filter(Some("warn,wft_pipeline=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn audit_filter_keeps_twin_crates_only() {
        let filter = audit_filter();
        assert!(filter.would_enable("wft_pipeline::silver", &Level::DEBUG));
        assert!(filter.would_enable("wft_logging", &Level::INFO));
        assert!(!filter.would_enable("wft_pipeline::gold", &Level::TRACE));
        assert!(!filter.would_enable("hyper::proto", &Level::ERROR));
    }

    #[test]
    fn audit_file_is_named_after_the_service() {
        assert_eq!(audit_file_name("wft-twinctl"), "wft-twinctl.audit.log");
    }
}
