//! Backend and model descriptors: the immutable registry loaded at boot
//! (C2) and the catalog entries it produces (C1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    OpenaiCompatible,
    OllamaCompatible,
}

/// One configured upstream LLM endpoint. Immutable after boot; the
/// registry holding these is read-only for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub backend_type: BackendType,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub auto_load: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl BackendDescriptor {
    /// Normalize the base URL: Ollama-compatible backends are addressed
    /// through their OpenAI-compatible `/v1` shim, so `/v1` is appended
    /// when the configured URL doesn't already end with it.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        match self.backend_type {
            BackendType::OllamaCompatible if !trimmed.ends_with("/v1") => {
                format!("{trimmed}/v1")
            }
            _ => trimmed.to_string(),
        }
    }

    /// The API key to present upstream. OpenAI-compatible clients
    /// require a bearer token even against backends that don't check
    /// one, so a dummy sentinel is used when none is configured.
    pub fn effective_api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or("NA")
    }
}

/// An entry in the aggregated model catalog (C1), composite-keyed by
/// `"<backend>/<raw-model-id>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default = "default_object")]
    pub object: String,
    pub created: i64,
    #[serde(default = "default_owned_by")]
    pub owned_by: String,
    pub backend_name: String,
}

fn default_object() -> String {
    "model".to_string()
}

fn default_owned_by() -> String {
    "gateway".to_string()
}

impl ModelDescriptor {
    pub fn new(backend_name: &str, raw_model_id: &str) -> Self {
        Self {
            id: format!("{backend_name}/{raw_model_id}"),
            object: default_object(),
            created: chrono::Utc::now().timestamp(),
            owned_by: default_owned_by(),
            backend_name: backend_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_base_url_gets_v1_suffix() {
        let b = BackendDescriptor {
            name: "ollama_local".into(),
            backend_type: BackendType::OllamaCompatible,
            base_url: "http://localhost:11434".into(),
            api_key: None,
            default_model: Some("llama3".into()),
            auto_load: true,
            timeout_seconds: None,
        };
        assert_eq!(b.normalized_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn ollama_base_url_not_doubled() {
        let b = BackendDescriptor {
            name: "ollama_local".into(),
            backend_type: BackendType::OllamaCompatible,
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            default_model: None,
            auto_load: false,
            timeout_seconds: None,
        };
        assert_eq!(b.normalized_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn missing_api_key_falls_back_to_sentinel() {
        let b = BackendDescriptor {
            name: "x".into(),
            backend_type: BackendType::OpenaiCompatible,
            base_url: "https://api.example.com".into(),
            api_key: None,
            default_model: None,
            auto_load: false,
            timeout_seconds: None,
        };
        assert_eq!(b.effective_api_key(), "NA");
    }

    #[test]
    fn composite_model_id_format() {
        let m = ModelDescriptor::new("ollama_local", "llama3");
        assert_eq!(m.id, "ollama_local/llama3");
    }
}
