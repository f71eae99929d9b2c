//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): requests by method, status
//! - `guard_request_duration_seconds` (histogram): latency distribution
//! - `guard_rejections_total` (counter): requests stopped, by pipeline stage
//! - `guard_audit_failures_total` (counter): audit writes that did not land
//! - `guard_retention_runs_total` (counter): sweeps by outcome
//!
//! # Design Decisions
//! - Labels carry bounded values only (no paths with ids, no user ids)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Pipeline stage that refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Csrf,
    Auth,
    Role,
    Validation,
    RateLimit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Csrf => "csrf",
            Stage::Auth => "auth",
            Stage::Role => "role",
            Stage::Validation => "validation",
            Stage::RateLimit => "rate_limit",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("guard_requests_total", &labels).increment(1);
    histogram!("guard_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(stage: Stage) {
    counter!("guard_rejections_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_audit_failure() {
    counter!("guard_audit_failures_total").increment(1);
}

pub fn record_retention_run(outcome: &'static str) {
    counter!("guard_retention_runs_total", "outcome" => outcome).increment(1);
}
