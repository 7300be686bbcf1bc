//! ---
//! wft_section: "03-persistence-logging"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Structured logging adapters and sinks."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Logging context shared by the pipeline stages.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Pipeline stage emitting the event (`bronze`, `silver`, ...).
    pub stage: Option<&'a str>,
    /// Simulation run identifier.
    pub run: Option<&'a str>,
    /// Farm identifier.
    pub farm: Option<&'a str>,
    /// Hour bucket key the event refers to.
    pub bucket: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a stage name.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach a simulation run identifier.
    pub fn with_run(mut self, run: &'a str) -> Self {
        self.run = Some(run);
        self
    }

    /// Attach a farm identifier.
    pub fn with_farm(mut self, farm: &'a str) -> Self {
        self.farm = Some(farm);
        self
    }

    /// Attach an hour bucket key.
    pub fn with_bucket(mut self, bucket: &'a str) -> Self {
        self.bucket = Some(bucket);
        self
    }
}

/// Outcome attached to stage lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// New buckets were written.
    Processed,
    /// Every candidate bucket had already been processed.
    NoNewWork,
    /// The stage aborted with an error.
    Fault,
}

impl StageOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Processed => "processed",
            StageOutcome::NoNewWork => "no-new-work",
            StageOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            StageOutcome::Processed | StageOutcome::NoNewWork => Level::INFO,
            StageOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a standardized stage event with its outcome.
pub fn log_stage_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: StageOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level.
    match outcome.level() {
        Level::ERROR => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %message
        ),
        _ => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            stage = ctx.stage.unwrap_or(""),
            run = ctx.run.unwrap_or(""),
            farm = ctx.farm.unwrap_or(""),
            bucket = ctx.bucket.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new().with_stage("silver").with_run("SIM-A");
        twin_info!(context = ctx.clone(), "curated {} rows", 42);
        twin_debug!("debug message");
        twin_warn!(context = ctx, "capacity factor undefined");
    }

    #[test]
    fn stage_event_helper_emits() {
        init();
        let ctx = LogContext::new()
            .with_stage("gold")
            .with_farm("F001")
            .with_bucket("SIM-A|F001|2026-01-05T00:00:00Z");
        log_stage_event(
            Some(&ctx),
            "stage.finished",
            "stage event helper executed",
            StageOutcome::Processed,
        );
        log_stage_event(None, "stage.failed", "stage fault", StageOutcome::Fault);
    }
}
