//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, kind
//! - `proxy_request_duration_seconds` (histogram): time to response head, by kind
//! - `proxy_playlist_lines_rewritten_total` (counter): manifest lines pointed back at the proxy
//!
//! `kind` is one of `passthrough`, `playlist`, `preflight`, `status`,
//! `rejected`, `error`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, kind: &'static str, start_time: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "kind" => kind
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds", "kind" => kind)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_playlist_rewrite(lines: usize) {
    ::metrics::counter!("proxy_playlist_lines_rewritten_total").increment(lines as u64);
}
