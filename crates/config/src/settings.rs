//! Root gateway configuration. Mirrors the `#[serde(default = "fn")]` +
//! matching `Default` impl convention throughout this codebase: config
//! structs are always fully constructible from an empty document, with
//! every default spelled out as its own named function rather than
//! scattered `Option` fallbacks in business code.

use gateway_core::{BackendDescriptor, Principal, ToolDefinition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighAvailabilityStrategy {
    None,
    Failover,
}

impl Default for HighAvailabilityStrategy {
    fn default() -> Self {
        HighAvailabilityStrategy::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub llm_backends: Vec<BackendDescriptor>,

    #[serde(default)]
    pub primary_backend_name: Option<String>,

    #[serde(default)]
    pub routing_backend_name: Option<String>,

    #[serde(default)]
    pub high_availability_strategy: HighAvailabilityStrategy,

    #[serde(default)]
    pub available_tools: Vec<ToolDefinition>,

    #[serde(default)]
    pub users: Vec<Principal>,

    #[serde(default = "default_searxng_base_url")]
    pub searxng_base_url: String,

    #[serde(default = "default_agent_model_prefix")]
    pub agent_model_prefix: String,

    #[serde(default = "default_cache_update_interval_minutes")]
    pub llm_cache_update_interval_minutes: u64,

    #[serde(default = "default_llm_backend_timeout")]
    pub llm_backend_timeout_seconds: u64,

    #[serde(default = "default_ratelimit_default")]
    pub ratelimit_default: String,

    #[serde(default)]
    pub system_admin_email: Option<String>,

    #[serde(default)]
    pub routing_prompt_file: Option<String>,

    #[serde(default = "default_task_retention_seconds")]
    pub task_retention_seconds: u64,

    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_searxng_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_agent_model_prefix() -> String {
    "harpou-agent/".to_string()
}

fn default_cache_update_interval_minutes() -> u64 {
    5
}

fn default_llm_backend_timeout() -> u64 {
    300
}

fn default_ratelimit_default() -> String {
    "100/hour".to_string()
}

fn default_task_retention_seconds() -> u64 {
    900
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_worker_count() -> usize {
    4
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            llm_backends: Vec::new(),
            primary_backend_name: None,
            routing_backend_name: None,
            high_availability_strategy: HighAvailabilityStrategy::default(),
            available_tools: Vec::new(),
            users: Vec::new(),
            searxng_base_url: default_searxng_base_url(),
            agent_model_prefix: default_agent_model_prefix(),
            llm_cache_update_interval_minutes: default_cache_update_interval_minutes(),
            llm_backend_timeout_seconds: default_llm_backend_timeout(),
            ratelimit_default: default_ratelimit_default(),
            system_admin_email: None,
            routing_prompt_file: None,
            task_retention_seconds: default_task_retention_seconds(),
            time_zone: default_time_zone(),
            log_dir: None,
            bind_address: default_bind_address(),
            worker_count: default_worker_count(),
        }
    }
}

impl GatewaySettings {
    /// Boot-time validation: unique backend names (also enforced by
    /// `BackendRegistry::new`, checked here earlier so config errors
    /// surface before any registry is built), and that
    /// `primary_backend_name`/`routing_backend_name` actually name a
    /// configured backend when set.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.llm_backends.is_empty() {
            return Err(ConfigValidationError::NoBackendsConfigured);
        }

        let mut seen = std::collections::HashSet::new();
        for backend in &self.llm_backends {
            if !seen.insert(backend.name.as_str()) {
                return Err(ConfigValidationError::DuplicateBackendName(
                    backend.name.clone(),
                ));
            }
        }

        if let Some(primary) = &self.primary_backend_name {
            if !seen.contains(primary.as_str()) {
                return Err(ConfigValidationError::UnknownBackendReference {
                    field: "primary_backend_name",
                    name: primary.clone(),
                });
            }
        }

        if let Some(routing) = &self.routing_backend_name {
            if !seen.contains(routing.as_str()) {
                return Err(ConfigValidationError::UnknownBackendReference {
                    field: "routing_backend_name",
                    name: routing.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("at least one entry in llm_backends is required")]
    NoBackendsConfigured,
    #[error("duplicate backend name in llm_backends: {0}")]
    DuplicateBackendName(String),
    #[error("{field} references unknown backend {name:?}")]
    UnknownBackendReference {
        field: &'static str,
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = GatewaySettings::default();
        assert_eq!(s.agent_model_prefix, "harpou-agent/");
        assert_eq!(s.llm_cache_update_interval_minutes, 5);
        assert_eq!(s.task_retention_seconds, 900);
    }

    #[test]
    fn validate_rejects_empty_backends() {
        let s = GatewaySettings::default();
        assert!(matches!(
            s.validate(),
            Err(ConfigValidationError::NoBackendsConfigured)
        ));
    }

    #[test]
    fn validate_rejects_unknown_routing_backend_reference() {
        use gateway_core::BackendType;
        let mut s = GatewaySettings::default();
        s.llm_backends.push(BackendDescriptor {
            name: "a".into(),
            backend_type: BackendType::OpenaiCompatible,
            base_url: "https://a.example.com".into(),
            api_key: None,
            default_model: Some("m".into()),
            auto_load: true,
            timeout_seconds: None,
        });
        s.routing_backend_name = Some("b".into());
        assert!(matches!(
            s.validate(),
            Err(ConfigValidationError::UnknownBackendReference { .. })
        ));
    }
}
