use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all backfill metrics
const PREFIX: &str = "search_backfill";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref BACKFILL_BATCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_batches_total"), "Backfill batches committed, by outcome"),
        &["outcome"]
    ).expect("Failed to create batches_total metric");

    pub static ref BACKFILL_INTERACTIONS_PROCESSED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_interactions_processed_total"),
        "Interactions visited by committed backfill batches"
    ).expect("Failed to create interactions_processed_total metric");

    pub static ref BACKFILL_BATCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_batch_duration_seconds"),
            "Time a backfill batch held the write transaction"
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.09, 0.1, 0.25, 0.5, 1.0])
    ).expect("Failed to create batch_duration_seconds metric");

    pub static ref BACKFILL_JOB_RUNNING: Gauge = Gauge::new(
        format!("{PREFIX}_job_running"),
        "1 while a backfill attempt is executing"
    ).expect("Failed to create job_running metric");

    pub static ref BACKFILL_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_attempts_total"), "Backfill attempts, by result"),
        &["result"]
    ).expect("Failed to create attempts_total metric");
}

/// Register all metrics. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(BACKFILL_BATCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKFILL_INTERACTIONS_PROCESSED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKFILL_BATCH_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BACKFILL_JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(BACKFILL_ATTEMPTS_TOTAL.clone()));
}

pub fn record_batch(outcome: &str, processed: usize, duration: Duration) {
    BACKFILL_BATCHES_TOTAL.with_label_values(&[outcome]).inc();
    BACKFILL_INTERACTIONS_PROCESSED_TOTAL.inc_by(processed as f64);
    BACKFILL_BATCH_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn set_job_running(running: bool) {
    BACKFILL_JOB_RUNNING.set(if running { 1.0 } else { 0.0 });
}

pub fn record_attempt(result: &str) {
    BACKFILL_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}

/// Renders the registry in the prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            String::new()
        }
    }
}
