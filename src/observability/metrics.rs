//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): pipeline latency
//! - `proxy_cache_events_total` (counter): tier × event (write, hit, miss)
//! - `proxy_cache_entries` (gauge): live server-tier entries
//! - `proxy_rule_failures_total` (counter): rules skipped for bad patterns
//!
//! Recording is a no-op until a recorder is installed, so tests and the
//! CLI can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::RuleKind;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(tier: &'static str, event: &'static str) {
    counter!("proxy_cache_events_total", "tier" => tier, "event" => event).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}

pub fn record_rule_failure(kind: RuleKind) {
    let kind = match kind {
        RuleKind::Url => "url",
        RuleKind::Header => "header",
        RuleKind::Content => "content",
    };
    counter!("proxy_rule_failures_total", "kind" => kind).increment(1);
}
