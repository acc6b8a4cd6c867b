//! The process-wide, dependency-injected context object (Design Notes
//! 9: "model as a single dependency-injected context object constructed
//! at boot; avoid true globals"). Every handler, task and background
//! job receives a `GatewayContext` (cheap to clone: every field is an
//! `Arc`) instead of reaching for statics.

use crate::catalog::CatalogCache;
use crate::registry::{BackendRegistry, PrincipalMap, ToolRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayContext {
    pub backends: Arc<BackendRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub principals: Arc<PrincipalMap>,
    pub catalog: Arc<CatalogCache>,
    /// Shared `reqwest::Client` so every backend call and tool fetch
    /// reuses the same connection pool instead of paying a fresh
    /// TLS/TCP handshake per request.
    pub http_client: reqwest::Client,
}

impl GatewayContext {
    pub fn new(
        backends: BackendRegistry,
        tools: ToolRegistry,
        principals: PrincipalMap,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            backends: Arc::new(backends),
            tools: Arc::new(tools),
            principals: Arc::new(principals),
            catalog: Arc::new(CatalogCache::new()),
            http_client,
        }
    }
}
