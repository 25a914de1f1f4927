//! Metrics collection and exposition.
//!
//! # Metrics
//! - `session_stage_transitions_total` (counter): stages entered, by `stage`
//! - `session_failures_total` (counter): terminal failures, by `stage`
//! - `session_messages_received_total` (counter): messages read
//! - `session_bytes_received_total` (counter): payload bytes read

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::session::state::SessionState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transition(state: SessionState) {
    metrics::counter!("session_stage_transitions_total", "stage" => state.as_str()).increment(1);
}

pub fn record_failure(label: &'static str) {
    metrics::counter!("session_failures_total", "stage" => label).increment(1);
}

pub fn record_bytes_received(bytes: usize) {
    metrics::counter!("session_messages_received_total").increment(1);
    metrics::counter!("session_bytes_received_total").increment(bytes as u64);
}
