use std::net::SocketAddr;

use metrics::{counter, gauge, increment_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

use super::error::{SyncError, SyncResult};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from inside a tokio runtime; the exporter serves `/metrics`
/// from a background task.
pub fn init_metrics(addr: SocketAddr) -> SyncResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| SyncError::Metrics(e.to_string()))?;

    tracing::info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record a completed cycle
pub fn record_cycle_success(desired: usize, added: usize, removed: usize) {
    increment_counter!("sync_cycles_total", "result" => "success");
    counter!("sync_clients_added_total", added as u64);
    counter!("sync_clients_removed_total", removed as u64);
    gauge!("sync_desired_ranges", desired as f64);
    gauge!(
        "sync_last_success_timestamp_seconds",
        chrono::Utc::now().timestamp() as f64
    );
}

/// Record a failed cycle, labelled by error kind
pub fn record_cycle_failure(kind: &'static str) {
    increment_counter!("sync_cycles_total", "result" => "failure", "kind" => kind);
}
