//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portico_requests_total` (counter): requests by kind, status
//! - `portico_request_duration_seconds` (histogram): latency by kind
//! - `portico_websocket_bridges_active` (gauge): live bridged connections
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// What kind of handler produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Proxy,
    WebSocket,
    Static,
    Unrouted,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Proxy => "proxy",
            RequestKind::WebSocket => "websocket",
            RequestKind::Static => "static",
            RequestKind::Unrouted => "unrouted",
        }
    }
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(kind: RequestKind, status: u16, start: Instant) {
    metrics::counter!(
        "portico_requests_total",
        "kind" => kind.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("portico_request_duration_seconds", "kind" => kind.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn set_active_bridges(count: u64) {
    metrics::gauge!("portico_websocket_bridges_active").set(count as f64);
}
