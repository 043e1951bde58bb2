use anyhow::{anyhow, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const QUEUE_NAME: &str = "woo-events";

const DURATION_BUCKETS_MS: &[f64] = &[10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0];

/// Installs the process-wide Prometheus recorder and returns the handle the
/// `/metrics` endpoint renders from. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("integration_event_processing_duration_ms".to_string()),
            DURATION_BUCKETS_MS,
        )
        .map_err(|e| anyhow!("failed to configure metrics buckets: {e}"))?
        .install_recorder()
        .map_err(|e| anyhow!("failed to install metrics recorder: {e}"))?;

    describe_counter!("integration_events_received_total", "Total number of events received");
    describe_counter!("integration_events_processed_total", "Total number of events processed");
    describe_histogram!(
        "integration_event_processing_duration_ms",
        "Event processing duration in milliseconds"
    );
    describe_gauge!("integration_queue_depth", "Current queue depth");
    describe_gauge!(
        "integration_queue_oldest_job_age_seconds",
        "Age of the oldest job in the queue"
    );
    describe_counter!("integration_idempotency_hits_total", "Total number of idempotency key hits");
    describe_counter!("integration_retries_total", "Total number of event retries");
    describe_counter!("integration_dlq_total", "Total number of events sent to DLQ");

    Ok(handle)
}

pub fn record_event_received(source: &str, event_type: &str) {
    counter!(
        "integration_events_received_total",
        "source" => source.to_string(),
        "event_type" => event_type.to_string()
    )
    .increment(1);
}

pub fn record_event_processed(status: &str, event_type: &str) {
    counter!(
        "integration_events_processed_total",
        "status" => status.to_string(),
        "event_type" => event_type.to_string()
    )
    .increment(1);
}

pub fn record_processing_duration(event_type: &str, millis: f64) {
    histogram!(
        "integration_event_processing_duration_ms",
        "event_type" => event_type.to_string()
    )
    .record(millis);
}

/// A hit is a duplicate detection at claim time, labeled with the status
/// the duplicate observed. Terminal-status writes are not hits.
pub fn record_idempotency_hit(status: &str) {
    counter!("integration_idempotency_hits_total", "status" => status.to_string()).increment(1);
}

pub fn record_retry(event_type: &str) {
    counter!("integration_retries_total", "event_type" => event_type.to_string()).increment(1);
}

pub fn record_dlq(event_type: &str, reason: &str) {
    counter!(
        "integration_dlq_total",
        "event_type" => event_type.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn set_queue_depth(queue: &str, depth: f64) {
    gauge!("integration_queue_depth", "queue" => queue.to_string()).set(depth);
}

pub fn set_oldest_job_age(queue: &str, age_seconds: f64) {
    gauge!("integration_queue_oldest_job_age_seconds", "queue" => queue.to_string()).set(age_seconds);
}
