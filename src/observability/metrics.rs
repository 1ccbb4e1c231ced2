//! Metrics collection and exposition.
//!
//! # Metrics
//! - `plug_requests_total` (counter): adapted requests by body kind
//! - `plug_body_rejections_total` (counter): undecodable bodies by kind, status
//! - `plug_replies_total` (counter): envelopes written by outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_plugged(kind: &'static str) {
    ::metrics::counter!("plug_requests_total", "kind" => kind).increment(1);
}

pub fn record_body_rejected(kind: &'static str, status: u16) {
    ::metrics::counter!(
        "plug_body_rejections_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_reply(outcome: &'static str) {
    ::metrics::counter!("plug_replies_total", "outcome" => outcome).increment(1);
}
