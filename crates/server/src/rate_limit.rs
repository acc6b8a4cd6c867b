//! Per-principal rate limiting (C10): one `leaky_bucket::RateLimiter`
//! per principal username, built lazily on first request and cached in
//! `AppState::rate_limiters` (spec 5). `RateLimitSpec::Unlimited`
//! (the `"unlimited"` sentinel) skips limiting entirely.

use crate::state::AppState;
use gateway_core::{Principal, RateLimitPeriod, RateLimitSpec, PUBLIC_ACCESS_USERNAME};
use leaky_bucket::RateLimiter;
use std::sync::Arc;

/// `principal.rate_limit`, falling back to the configured global
/// default (spec 4.6: "Limit = principal's rate_limit or global
/// default"). An unparsable default is treated as unlimited rather
/// than panicking at request time -- config validation is the place
/// to catch that, not every request.
pub fn effective_spec(principal: &Principal, default_spec: &str) -> RateLimitSpec {
    principal.rate_limit.unwrap_or_else(|| {
        default_spec.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, default_spec, "unparsable RATELIMIT_DEFAULT, treating as unlimited");
            RateLimitSpec::Unlimited
        })
    })
}

/// Bucket key: principal username, unless the caller is the shared
/// anonymous `public_access` identity, in which case fall back to the
/// client IP so distinct anonymous callers don't share one bucket
/// (spec 4.6: "Key = principal username (fallback client IP)").
pub fn key_for(principal: &Principal, client_ip: Option<&str>) -> String {
    if principal.username == PUBLIC_ACCESS_USERNAME {
        client_ip.unwrap_or("unknown").to_string()
    } else {
        principal.username.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded")]
    Exceeded,
}

/// Acquire one token from `key`'s bucket, parsed from `spec`, creating
/// the bucket on first use. `Unlimited` always succeeds without
/// touching the map.
pub async fn check(state: &AppState, key: &str, spec: RateLimitSpec) -> Result<(), RateLimitError> {
    let RateLimitSpec::Limited { max_requests, period } = spec else {
        return Ok(());
    };

    let limiter = state
        .rate_limiters
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(build_limiter(max_requests, period)))
        .clone();

    if limiter.try_acquire(1) {
        Ok(())
    } else {
        Err(RateLimitError::Exceeded)
    }
}

fn build_limiter(max_requests: u32, period: RateLimitPeriod) -> RateLimiter {
    let max_requests = max_requests as usize;
    RateLimiter::builder()
        .initial(max_requests)
        .refill(max_requests)
        .max(max_requests)
        .interval(period.as_duration())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::GatewaySettings;
    use gateway_core::{BackendRegistry, GatewayContext, PrincipalMap, ToolRegistry};
    use gateway_llm::{Connector, HighAvailabilityStrategy};
    use gateway_orchestrator::OrchestratorConfig;
    use gateway_tasks::{InProcessTaskQueue, TaskStore};
    use std::time::Duration;

    fn state() -> AppState {
        let context = GatewayContext::new(
            BackendRegistry::new(vec![]).unwrap(),
            ToolRegistry::new(vec![]),
            PrincipalMap::new(vec![]),
            reqwest::Client::new(),
        );
        let store = Arc::new(TaskStore::new(Duration::from_secs(900)));
        let (queue, _receiver) = InProcessTaskQueue::new(store, 8);
        let settings = GatewaySettings::default();
        let orchestrator_config = AppState::orchestrator_config_from(&settings);
        AppState {
            connector: Arc::new(Connector::new(
                context.http_client.clone(),
                context.backends.clone(),
                HighAvailabilityStrategy::None,
                Duration::from_secs(30),
            )),
            context,
            queue: Arc::new(queue),
            settings: Arc::new(settings),
            orchestrator_config: Arc::new(orchestrator_config),
            rate_limiters: Arc::new(dashmap::DashMap::new()),
            metrics_handle: crate::metrics::init_metrics(),
        }
    }

    #[tokio::test]
    async fn unlimited_spec_never_blocks() {
        let state = state();
        for _ in 0..100 {
            assert!(check(&state, "anyone", RateLimitSpec::Unlimited).await.is_ok());
        }
    }

    #[tokio::test]
    async fn limited_spec_exhausts_then_rejects() {
        let state = state();
        let spec = RateLimitSpec::Limited {
            max_requests: 2,
            period: RateLimitPeriod::Minute,
        };
        assert!(check(&state, "alice", spec).await.is_ok());
        assert!(check(&state, "alice", spec).await.is_ok());
        assert!(check(&state, "alice", spec).await.is_err());
    }

    #[test]
    fn effective_spec_prefers_principal_override() {
        let p = Principal {
            key: "k".into(),
            username: "alice".into(),
            display_name: None,
            rate_limit: Some(RateLimitSpec::Limited { max_requests: 5, period: RateLimitPeriod::Second }),
            persona_prompt_file: None,
        };
        assert_eq!(
            effective_spec(&p, "100/hour"),
            RateLimitSpec::Limited { max_requests: 5, period: RateLimitPeriod::Second }
        );
    }

    #[test]
    fn effective_spec_falls_back_to_default() {
        let p = Principal {
            key: "k".into(),
            username: "alice".into(),
            display_name: None,
            rate_limit: None,
            persona_prompt_file: None,
        };
        assert_eq!(
            effective_spec(&p, "100/hour"),
            RateLimitSpec::Limited { max_requests: 100, period: RateLimitPeriod::Hour }
        );
    }

    #[test]
    fn key_for_public_access_uses_client_ip() {
        let p = Principal::anonymous();
        assert_eq!(key_for(&p, Some("1.2.3.4")), "1.2.3.4");
        assert_eq!(key_for(&p, None), "unknown");
    }

    #[test]
    fn key_for_named_principal_uses_username() {
        let p = Principal {
            key: "k".into(),
            username: "alice".into(),
            display_name: None,
            rate_limit: None,
            persona_prompt_file: None,
        };
        assert_eq!(key_for(&p, Some("1.2.3.4")), "alice");
    }

    #[tokio::test]
    async fn distinct_principals_get_distinct_buckets() {
        let state = state();
        let spec = RateLimitSpec::Limited {
            max_requests: 1,
            period: RateLimitPeriod::Minute,
        };
        assert!(check(&state, "alice", spec).await.is_ok());
        assert!(check(&state, "alice", spec).await.is_err());
        assert!(check(&state, "bob", spec).await.is_ok());
    }
}
