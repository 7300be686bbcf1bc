//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{self, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{Result, Stage};

/// Counters and timings published by the pipeline stages.
#[derive(Clone)]
pub struct PipelineMetrics {
    rows_read: IntCounterVec,
    rows_written: IntCounterVec,
    buckets_processed: IntCounterVec,
    duplicates_removed: IntCounter,
    range_violations: IntCounter,
    stage_duration: HistogramVec,
    registry: Arc<Registry>,
}

impl PipelineMetrics {
    /// Register all pipeline metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let rows_read = IntCounterVec::new(
            Opts::new("wft_stage_rows_read_total", "Rows read by a pipeline stage"),
            &["stage"],
        )?;
        registry.register(Box::new(rows_read.clone()))?;

        let rows_written = IntCounterVec::new(
            Opts::new("wft_stage_rows_written_total", "Rows persisted by a pipeline stage"),
            &["stage"],
        )?;
        registry.register(Box::new(rows_written.clone()))?;

        let buckets_processed = IntCounterVec::new(
            Opts::new(
                "wft_stage_buckets_processed_total",
                "Hour buckets newly recorded in a stage's processed-key set",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(buckets_processed.clone()))?;

        let duplicates_removed = IntCounter::new(
            "wft_silver_duplicates_removed_total",
            "Raw rows dropped as duplicates during curation",
        )?;
        registry.register(Box::new(duplicates_removed.clone()))?;

        let range_violations = IntCounter::new(
            "wft_silver_range_violations_total",
            "Curated rows flagged with at least one range violation",
        )?;
        registry.register(Box::new(range_violations.clone()))?;

        let histogram_opts = HistogramOpts::new(
            "wft_stage_duration_seconds",
            "Wall-clock time spent in one stage invocation",
        )
        .buckets(prometheus::exponential_buckets(0.001, 2.0, 14)?);
        let stage_duration = HistogramVec::new(histogram_opts, &["stage"])?;
        registry.register(Box::new(stage_duration.clone()))?;

        Ok(Self {
            rows_read,
            rows_written,
            buckets_processed,
            duplicates_removed,
            range_violations,
            stage_duration,
            registry,
        })
    }

    pub fn record_rows_read(&self, stage: Stage, rows: usize) {
        self.rows_read
            .with_label_values(&[stage.as_str()])
            .inc_by(rows as u64);
    }

    pub fn record_rows_written(&self, stage: Stage, rows: usize) {
        self.rows_written
            .with_label_values(&[stage.as_str()])
            .inc_by(rows as u64);
    }

    pub fn record_buckets(&self, stage: Stage, buckets: usize) {
        self.buckets_processed
            .with_label_values(&[stage.as_str()])
            .inc_by(buckets as u64);
    }

    pub fn record_duplicates(&self, rows: usize) {
        self.duplicates_removed.inc_by(rows as u64);
    }

    pub fn record_violations(&self, rows: usize) {
        self.range_violations.inc_by(rows as u64);
    }

    pub fn observe_stage_duration(&self, stage: Stage, seconds: f64) {
        self.stage_duration
            .with_label_values(&[stage.as_str()])
            .observe(seconds);
    }

    /// Text exposition of every metric in the backing registry.
    pub fn render(&self) -> Result<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = PipelineMetrics::new(Arc::new(Registry::new())).unwrap();
        metrics.record_rows_read(Stage::Silver, 4328);
        metrics.record_rows_written(Stage::Silver, 4320);
        metrics.record_duplicates(8);
        metrics.observe_stage_duration(Stage::Silver, 0.25);

        let text = metrics.render().unwrap();
        assert!(text.contains("wft_stage_rows_read_total{stage=\"silver\"} 4328"));
        assert!(text.contains("wft_stage_rows_written_total{stage=\"silver\"} 4320"));
        assert!(text.contains("wft_silver_duplicates_removed_total 8"));
        assert!(text.contains("wft_stage_duration_seconds_count{stage=\"silver\"} 1"));
    }

    #[test]
    fn double_registration_fails() {
        let registry = Arc::new(Registry::new());
        PipelineMetrics::new(registry.clone()).unwrap();
        assert!(PipelineMetrics::new(registry).is_err());
    }
}
