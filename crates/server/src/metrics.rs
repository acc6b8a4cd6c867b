//! Prometheus metrics (spec 10.1): request counters by route/status, a
//! task queue-depth gauge, and a per-backend failover counter, exposed
//! on `/metrics` alongside the HTTP surface.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder exactly once and return its handle,
/// cheap to clone into `AppState`. Safe to call repeatedly (boot, and
/// every test that builds its own `AppState`) since only the first
/// call actually installs the recorder.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install prometheus recorder")
        })
        .clone()
}

pub fn record_request(route: &str, status: u16) {
    metrics::counter!("gateway_http_requests_total", "route" => route.to_string(), "status" => status.to_string())
        .increment(1);
}

// Per-backend failover counts (`gateway_backend_failover_total`) and the
// task queue-depth gauge (`gateway_task_queue_depth`) are emitted directly
// from `gateway-llm`'s connector and `gateway-tasks`'s `TaskStore` via the
// shared `metrics` facade, at the point the underlying event happens,
// rather than routed back through this crate.

pub async fn metrics_handler(state: axum::extract::State<crate::state::AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics_handle.render())
}
