//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted client connections
//! - `proxy_active_connections` (gauge): current connection count
//! - `proxy_exchanges_total` (counter): completed exchanges by kind (connect, relay)
//! - `proxy_errors_total` (counter): failed connections by error kind
//! - `proxy_accept_errors_total` (counter): listener accept failures
//! - `proxy_bytes_total` (counter): forwarded bytes by direction
//! - `proxy_transformed_bytes_total` (counter): body bytes run through the codec
//!
//! Every call is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::http::forward::Direction;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted() {
    counter!("proxy_connections_total").increment(1);
}

pub fn set_active_connections(count: u64) {
    gauge!("proxy_active_connections").set(count as f64);
}

pub fn record_exchange(kind: &'static str) {
    counter!("proxy_exchanges_total", "kind" => kind).increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("proxy_errors_total", "kind" => kind).increment(1);
}

pub fn record_accept_error() {
    counter!("proxy_accept_errors_total").increment(1);
}

pub fn record_bytes(direction: Direction, bytes: usize) {
    counter!("proxy_bytes_total", "direction" => direction.as_str()).increment(bytes as u64);
}

pub fn record_transformed_bytes(bytes: usize) {
    counter!("proxy_transformed_bytes_total").increment(bytes as u64);
}
