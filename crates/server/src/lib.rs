//! The LLM API Gateway's HTTP surface (C9): request routing, bearer
//! auth, per-principal rate limiting, audit logging and metrics, built
//! on top of `gateway-core`, `gateway-llm`, `gateway-tools` and
//! `gateway-orchestrator`.

pub mod audit;
pub mod auth;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod sse;
pub mod state;

pub use auth::auth_middleware;
pub use http::create_router;
pub use metrics::{init_metrics, record_request};
pub use rate_limit::RateLimitError;
pub use state::AppState;
