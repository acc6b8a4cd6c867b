//! Process-wide state shared by every axum handler: the boot-built
//! `GatewayContext` plus the pieces that live alongside it but outside
//! `gateway-core` (the connector, the task queue, rate limiters).

use dashmap::DashMap;
use gateway_config::GatewaySettings;
use gateway_core::GatewayContext;
use gateway_llm::Connector;
use gateway_orchestrator::OrchestratorConfig;
use gateway_tasks::InProcessTaskQueue;
use leaky_bucket::RateLimiter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub context: GatewayContext,
    pub connector: Arc<Connector>,
    pub queue: Arc<InProcessTaskQueue>,
    pub settings: Arc<GatewaySettings>,
    pub orchestrator_config: Arc<OrchestratorConfig>,
    /// One leaky bucket per principal username, created lazily on a
    /// principal's first request (spec 5's "built lazily on first
    /// request per principal").
    pub rate_limiters: Arc<DashMap<String, Arc<RateLimiter>>>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn orchestrator_config_from(settings: &GatewaySettings) -> OrchestratorConfig {
        OrchestratorConfig {
            routing_backend_name: settings.routing_backend_name.clone(),
            primary_backend_name: settings.primary_backend_name.clone(),
            searxng_base_url: settings.searxng_base_url.clone(),
            time_zone: settings.time_zone.clone(),
            system_admin_email: settings.system_admin_email.clone(),
        }
    }
}
