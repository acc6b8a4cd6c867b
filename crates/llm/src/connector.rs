//! The LLM Connector (C3): model-id routing, per-backend client
//! construction, unary/streaming execution, JSON-mode normalization
//! and iterative failover.
//!
//! Failover is an explicit loop over backend registry order rather
//! than the recursive `tried_backends`-threaded calls in the original
//! -- this keeps the tried set's bound obvious and avoids stack depth
//! concerns, per the iterative-failover design note.

use crate::multimodal::inline_remote_images;
use crate::streaming::{parse_sse_chunks, ChunkStream};
use crate::wire::{ChatCompletionRequest, ChatCompletionResponse, ModelListResponse, ResponseFormat, WireMessage};
use gateway_core::{BackendDescriptor, BackendRegistry, Conversation, Error as CoreError, ModelDescriptor};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("backend not found: {0}")]
    BackendNotFound(String),
    #[error("configuration missing: {0}")]
    ConfigMissing(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },
}

impl From<ConnectorError> for CoreError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::BackendNotFound(b) => CoreError::BackendNotFound(b),
            ConnectorError::ConfigMissing(m) => CoreError::ConfigMissing(m),
            ConnectorError::Connection(m) => CoreError::ConnectionFailed(m),
            ConnectorError::Upstream { status, body } => CoreError::UpstreamError { status, body },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighAvailabilityStrategy {
    None,
    Failover,
}

/// A fully-resolved request ready to dispatch: which backend, which
/// raw model id on that backend's wire, and whether JSON mode and/or
/// streaming were requested.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub backend_name: String,
    pub raw_model: String,
    pub json_mode: bool,
    pub stream: bool,
}

/// Split `model-id` into `(backend, raw-model)` when it contains `/`;
/// otherwise resolve against `primary_backend_name`.
pub fn resolve_model_id<'a>(
    model_id: &'a str,
    backends: &BackendRegistry,
    primary_backend_name: Option<&'a str>,
) -> Result<(String, String), ConnectorError> {
    if let Some((backend, raw)) = model_id.split_once('/') {
        if backends.contains(backend) {
            return Ok((backend.to_string(), raw.to_string()));
        }
        // Not a known backend prefix: fall through to bare-model
        // handling only if there was no '/' at all. Since there was
        // one, and it doesn't name a backend, this is a hard failure
        // per spec 4.1 ("If the segment before / is not a known
        // backend name, fail with BackendNotFound").
        return Err(ConnectorError::BackendNotFound(backend.to_string()));
    }
    let primary = primary_backend_name
        .ok_or_else(|| ConnectorError::ConfigMissing("primary_backend_name not configured".into()))?;
    if !backends.contains(primary) {
        return Err(ConnectorError::BackendNotFound(primary.to_string()));
    }
    Ok((primary.to_string(), model_id.to_string()))
}

pub struct Connector {
    http_client: reqwest::Client,
    backends: std::sync::Arc<BackendRegistry>,
    ha_strategy: HighAvailabilityStrategy,
    default_backend_timeout: Duration,
}

impl Connector {
    pub fn new(
        http_client: reqwest::Client,
        backends: std::sync::Arc<BackendRegistry>,
        ha_strategy: HighAvailabilityStrategy,
        default_backend_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            backends,
            ha_strategy,
            default_backend_timeout,
        }
    }

    fn backend_timeout(&self, backend: &BackendDescriptor) -> Duration {
        backend
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_backend_timeout)
    }

    fn build_request(
        &self,
        backend: &BackendDescriptor,
        raw_model: &str,
        messages: &[WireMessage],
        stream: bool,
        json_mode: bool,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: raw_model.to_string(),
            messages: messages.to_vec(),
            stream: Some(stream),
            tools: None,
            tool_choice: None,
            response_format: if json_mode {
                Some(ResponseFormat::json_object())
            } else {
                None
            },
        }
    }

    /// Execute a non-streaming chat completion, with multimodal
    /// pre-processing and iterative failover.
    pub async fn chat_completion(
        &self,
        model_id: &str,
        primary_backend_name: Option<&str>,
        mut conversation: Conversation,
        mut json_mode: bool,
    ) -> Result<ChatCompletionResponse, ConnectorError> {
        let (start_backend, raw_model) =
            resolve_model_id(model_id, &self.backends, primary_backend_name)?;

        if inline_remote_images(&self.http_client, &mut conversation)
            .await
            .map(|substituted| substituted)
            .unwrap_or(false)
        {
            // Multimodal substitution is incompatible with JSON mode
            // upstream; silently disable it (spec 4.1).
            json_mode = false;
        }

        let wire_messages: Vec<WireMessage> = conversation.iter().map(WireMessage::from).collect();

        let mut tried: HashSet<String> = HashSet::new();
        let mut last_connection_error: Option<String> = None;

        for backend_name in self.backends.order_from(&start_backend) {
            if tried.contains(backend_name) {
                continue;
            }
            tried.insert(backend_name.to_string());

            let backend = self
                .backends
                .get(backend_name)
                .ok_or_else(|| ConnectorError::BackendNotFound(backend_name.to_string()))?;

            let request = self.build_request(backend, &raw_model, &wire_messages, false, json_mode);
            let url = format!("{}/chat/completions", backend.normalized_base_url());

            let send_result = self
                .http_client
                .post(&url)
                .timeout(self.backend_timeout(backend))
                .bearer_auth(backend.effective_api_key())
                .json(&request)
                .send()
                .await;

            let response = match send_result {
                Ok(r) => r,
                Err(e) => {
                    last_connection_error = Some(e.to_string());
                    if self.ha_strategy == HighAvailabilityStrategy::Failover && tried.len() < self.backends.len()
                    {
                        tracing::warn!(backend = backend_name, error = %e, "backend unreachable, failing over");
                        metrics::counter!("gateway_backend_failover_total", "backend" => backend_name.to_string())
                            .increment(1);
                        continue;
                    }
                    return Err(ConnectorError::Connection(e.to_string()));
                }
            };

            if !response.status().is_success() {
                // Protocol errors (4xx/5xx from a reachable backend)
                // never trigger failover -- the backend is fine, the
                // request is at fault.
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(ConnectorError::Upstream { status, body });
            }

            let mut parsed: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| ConnectorError::Upstream {
                    status: 502,
                    body: e.to_string(),
                })?;

            if json_mode {
                normalize_json_mode_content(&mut parsed);
            }

            return Ok(parsed);
        }

        Err(ConnectorError::Connection(last_connection_error.unwrap_or_else(|| {
            "no backends available".to_string()
        })))
    }

    /// Execute a streaming chat completion against the resolved
    /// backend. Per spec 5, streaming responses do not participate in
    /// failover once bytes have started flowing -- only the initial
    /// connection attempt does.
    pub async fn chat_completion_stream(
        &self,
        model_id: &str,
        primary_backend_name: Option<&str>,
        conversation: &Conversation,
    ) -> Result<ChunkStream, ConnectorError> {
        let (start_backend, raw_model) =
            resolve_model_id(model_id, &self.backends, primary_backend_name)?;
        let wire_messages: Vec<WireMessage> = conversation.iter().map(WireMessage::from).collect();

        let mut tried: HashSet<String> = HashSet::new();
        let mut last_connection_error: Option<String> = None;

        for backend_name in self.backends.order_from(&start_backend) {
            if tried.contains(backend_name) {
                continue;
            }
            tried.insert(backend_name.to_string());

            let backend = self
                .backends
                .get(backend_name)
                .ok_or_else(|| ConnectorError::BackendNotFound(backend_name.to_string()))?;

            let request = self.build_request(backend, &raw_model, &wire_messages, true, false);
            let url = format!("{}/chat/completions", backend.normalized_base_url());

            let send_result = self
                .http_client
                .post(&url)
                .timeout(self.backend_timeout(backend))
                .bearer_auth(backend.effective_api_key())
                .json(&request)
                .send()
                .await;

            let response = match send_result {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ConnectorError::Upstream { status, body });
                }
                Err(e) => {
                    last_connection_error = Some(e.to_string());
                    if self.ha_strategy == HighAvailabilityStrategy::Failover && tried.len() < self.backends.len()
                    {
                        tracing::warn!(backend = backend_name, error = %e, "backend unreachable, failing over");
                        metrics::counter!("gateway_backend_failover_total", "backend" => backend_name.to_string())
                            .increment(1);
                        continue;
                    }
                    return Err(ConnectorError::Connection(e.to_string()));
                }
            };

            return Ok(parse_sse_chunks(response));
        }

        Err(ConnectorError::Connection(last_connection_error.unwrap_or_else(|| {
            "no backends available".to_string()
        })))
    }

    /// C1/C8 support: list models from one backend's `/models` endpoint.
    pub async fn list_models(&self, backend: &BackendDescriptor) -> Result<Vec<ModelDescriptor>, ConnectorError> {
        let url = format!("{}/models", backend.normalized_base_url());
        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .bearer_auth(backend.effective_api_key())
            .send()
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Upstream { status, body });
        }

        let parsed: ModelListResponse = response.json().await.map_err(|e| ConnectorError::Upstream {
            status: 502,
            body: e.to_string(),
        })?;

        Ok(parsed
            .data
            .into_iter()
            .map(|m| ModelDescriptor::new(&backend.name, &m.id))
            .collect())
    }
}

/// When JSON mode was requested and streaming is off, try to parse
/// `choices[0].message.content` (a string) as JSON and replace it with
/// the parsed value. A parse failure is logged but not fatal -- the
/// raw string is returned untouched (spec 4.1).
fn normalize_json_mode_content(response: &mut ChatCompletionResponse) {
    let Some(choice) = response.choices.first_mut() else {
        return;
    };
    if let Value::String(raw) = &choice.message.content {
        match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => choice.message.content = parsed,
            Err(e) => {
                tracing::warn!(error = %e, "JSON mode content failed to parse, returning raw string");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{BackendType, Message};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Real OpenAI-compatible base URLs conventionally already include the
    // `/v1` segment (e.g. "https://api.openai.com/v1"); `normalized_base_url`
    // only appends it for the Ollama case, so tests mount mocks under it too.
    fn backend_desc(name: &str, base_url: &str) -> BackendDescriptor {
        BackendDescriptor {
            name: name.to_string(),
            backend_type: BackendType::OpenaiCompatible,
            base_url: format!("{}/v1", base_url.trim_end_matches('/')),
            api_key: None,
            default_model: Some("m".to_string()),
            auto_load: true,
            timeout_seconds: None,
        }
    }

    #[test]
    fn resolve_model_id_splits_on_slash() {
        let reg = BackendRegistry::new(vec![backend_desc("a", "https://a.test")]).unwrap();
        let (b, m) = resolve_model_id("a/llama3", &reg, None).unwrap();
        assert_eq!(b, "a");
        assert_eq!(m, "llama3");
    }

    #[test]
    fn resolve_model_id_unknown_prefix_fails() {
        let reg = BackendRegistry::new(vec![backend_desc("a", "https://a.test")]).unwrap();
        let err = resolve_model_id("unknown/llama3", &reg, None).unwrap_err();
        assert!(matches!(err, ConnectorError::BackendNotFound(b) if b == "unknown"));
    }

    #[test]
    fn resolve_bare_model_uses_primary_backend() {
        let reg = BackendRegistry::new(vec![backend_desc("a", "https://a.test")]).unwrap();
        let (b, m) = resolve_model_id("llama3", &reg, Some("a")).unwrap();
        assert_eq!(b, "a");
        assert_eq!(m, "llama3");
    }

    #[tokio::test]
    async fn direct_success_no_failover_needed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "object": "chat.completion", "created": 1, "model": "llama3",
                "choices": [{"index":0,"message":{"role":"assistant","content":"pong"},"finish_reason":"stop"}]
            })))
            .mount(&server)
            .await;

        let reg = BackendRegistry::new(vec![backend_desc("a", &server.uri())]).unwrap();
        let connector = Connector::new(
            reqwest::Client::new(),
            std::sync::Arc::new(reg),
            HighAvailabilityStrategy::None,
            Duration::from_secs(30),
        );
        let convo = vec![Message::user("ping")];
        let resp = connector
            .chat_completion("a/llama3", None, convo, false)
            .await
            .unwrap();
        assert_eq!(resp.choices[0].message.content, Value::String("pong".into()));
    }

    #[tokio::test]
    async fn failover_to_second_backend_on_connection_error() {
        let server_b = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "object": "chat.completion", "created": 1, "model": "llama3",
                "choices": [{"index":0,"message":{"role":"assistant","content":"from b"},"finish_reason":"stop"}]
            })))
            .mount(&server_b)
            .await;

        // "a" points at an address nothing listens on -> connection error.
        let reg = BackendRegistry::new(vec![
            backend_desc("a", "http://127.0.0.1:1"),
            backend_desc("b", &server_b.uri()),
        ])
        .unwrap();
        let connector = Connector::new(
            reqwest::Client::new(),
            std::sync::Arc::new(reg),
            HighAvailabilityStrategy::Failover,
            Duration::from_secs(5),
        );
        let convo = vec![Message::user("ping")];
        let resp = connector
            .chat_completion("a/llama3", None, convo, false)
            .await
            .unwrap();
        assert_eq!(resp.choices[0].message.content, Value::String("from b".into()));
    }

    #[tokio::test]
    async fn protocol_error_never_triggers_failover() {
        let server_a = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server_a)
            .await;

        let reg = BackendRegistry::new(vec![
            backend_desc("a", &server_a.uri()),
            backend_desc("b", "http://127.0.0.1:1"),
        ])
        .unwrap();
        let connector = Connector::new(
            reqwest::Client::new(),
            std::sync::Arc::new(reg),
            HighAvailabilityStrategy::Failover,
            Duration::from_secs(5),
        );
        let convo = vec![Message::user("ping")];
        let err = connector
            .chat_completion("a/llama3", None, convo, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Upstream { status: 400, .. }));
    }

    #[test]
    fn json_mode_normalization_parses_valid_json_string() {
        let mut resp = ChatCompletionResponse {
            id: "1".into(),
            object: "chat.completion".into(),
            created: 1,
            model: "m".into(),
            usage: None,
            choices: vec![crate::wire::Choice {
                index: 0,
                message: crate::wire::ResponseMessage {
                    role: "assistant".into(),
                    content: Value::String(r#"{"a":1}"#.into()),
                },
                finish_reason: Some("stop".into()),
            }],
        };
        normalize_json_mode_content(&mut resp);
        assert_eq!(resp.choices[0].message.content, serde_json::json!({"a":1}));
    }

    #[test]
    fn json_mode_normalization_falls_back_on_invalid_json() {
        let mut resp = ChatCompletionResponse {
            id: "1".into(),
            object: "chat.completion".into(),
            created: 1,
            model: "m".into(),
            usage: None,
            choices: vec![crate::wire::Choice {
                index: 0,
                message: crate::wire::ResponseMessage {
                    role: "assistant".into(),
                    content: Value::String("not json".into()),
                },
                finish_reason: Some("stop".into()),
            }],
        };
        normalize_json_mode_content(&mut resp);
        assert_eq!(resp.choices[0].message.content, Value::String("not json".into()));
    }
}
