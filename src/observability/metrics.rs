//! Metrics collection and exposition.
//!
//! # Metrics
//! - `audit_invocations_submitted_total` (counter): invocations handed to the pool
//! - `audit_call_duration_ms` (histogram): duration of instrumented calls
//! - `audit_records_dropped_total` (counter): records dropped, by reason
//! - `audit_serialization_failures_total` (counter): fields recorded empty, by field
//! - `audit_records_written_total` (counter): blocks appended to disk
//! - `audit_write_failures_total` (counter): abandoned writes, by stage
//! - `audit_queue_depth` (gauge): pending records in the dispatcher
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until an exporter is installed
//! - Prometheus exporter is optional and configured at startup

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_invocation_submitted() {
    metrics::counter!("audit_invocations_submitted_total").increment(1);
}

pub fn record_call_duration(elapsed_ms: i64) {
    metrics::histogram!("audit_call_duration_ms").record(elapsed_ms as f64);
}

pub fn record_dropped(reason: &'static str) {
    metrics::counter!("audit_records_dropped_total", "reason" => reason).increment(1);
}

pub fn record_serialization_failure(field: &'static str) {
    metrics::counter!("audit_serialization_failures_total", "field" => field).increment(1);
}

pub fn record_written() {
    metrics::counter!("audit_records_written_total").increment(1);
}

pub fn record_write_failure(stage: &'static str) {
    metrics::counter!("audit_write_failures_total", "stage" => stage).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("audit_queue_depth").set(depth as f64);
}
