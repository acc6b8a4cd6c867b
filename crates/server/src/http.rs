//! HTTP Surface (C9): the OpenAI-compatible chat completions endpoint,
//! model catalog listing, task status polling, and liveness/metrics
//! probes. Router construction (middleware ordering, CORS/trace
//! layers) follows this codebase's existing `create_router` pattern.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use gateway_core::{Error as CoreError, Message, Principal};
use gateway_orchestrator::OrchestratorConfig;
use gateway_tasks::{TaskFuture, TaskQueue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::metrics::metrics_handler;
use crate::rate_limit;
use crate::sse::make_sse_stream;
use crate::state::AppState;
use crate::{audit, metrics};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", axum::routing::post(chat_completions))
        .route("/v1/tasks/status/:id", get(task_status))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

#[derive(Debug, Serialize)]
struct ModelListResponse {
    object: &'static str,
    data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
    object: String,
    created: i64,
    owned_by: String,
}

async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    if state.context.catalog.is_empty() {
        gateway_orchestrator::refresh_catalog(&state.connector, &state.context.backends, &state.context.catalog).await;
    }

    let snapshot = state.context.catalog.snapshot();
    let data = snapshot
        .values()
        .map(|m| ModelEntry {
            id: m.id.clone(),
            object: m.object.clone(),
            created: m.created,
            owned_by: m.owned_by.clone(),
        })
        .collect();

    Json(ModelListResponse { object: "list", data })
}

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    #[allow(dead_code)]
    tools: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    tool_choice: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct TaskAcceptedResponse {
    task_id: Uuid,
    status_endpoint: String,
    message: &'static str,
}

async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    principal: axum::extract::Extension<Arc<Principal>>,
    body: axum::extract::Json<serde_json::Value>,
) -> Response {
    let request_id = headers
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4);
    let sid = headers
        .get("X-SID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    audit::log_request(request_id, &sid, &body.0, &headers_to_json(&headers));

    let request: ChatCompletionRequest = match serde_json::from_value(body.0) {
        Ok(r) => r,
        Err(e) => {
            return error_response(request_id, &sid, StatusCode::BAD_REQUEST, CoreError::Validation(e.to_string()));
        }
    };

    if let Err(e) = validate_request(&request) {
        let status = e.status_code();
        return error_response(request_id, &sid, status, e);
    }

    let spec = rate_limit::effective_spec(&principal.0, &state.settings.ratelimit_default);
    let client_ip = client_ip(&headers);
    let key = rate_limit::key_for(&principal.0, client_ip.as_deref());
    if rate_limit::check(&state, &key, spec).await.is_err() {
        return error_response(request_id, &sid, StatusCode::TOO_MANY_REQUESTS, CoreError::RateLimited);
    }

    let span = tracing::info_span!("chat_completions", %request_id, sid = %sid);
    let _entered = span.enter();

    let is_agentic = request.model.starts_with(&state.settings.agent_model_prefix);

    if is_agentic {
        let real_model = request.model[state.settings.agent_model_prefix.len()..].to_string();
        return enqueue_orchestration(&state, request_id, &sid, request.messages, real_model, Some((*principal.0).clone())).await;
    }

    if request.stream {
        return stream_direct(&state, request_id, &sid, request.model, request.messages).await;
    }

    // spec 4.6 step 6: stream=false direct path still enqueues a task
    // and returns 202, matching the original's routes.py behavior.
    enqueue_direct(&state, request_id, &sid, request.model, request.messages).await
}

fn validate_request(request: &ChatCompletionRequest) -> Result<(), CoreError> {
    if request.messages.is_empty() {
        return Err(CoreError::Validation("messages must be a non-empty list".to_string()));
    }
    if request.model.trim().is_empty() {
        return Err(CoreError::Validation("model is required".to_string()));
    }
    Ok(())
}

async fn enqueue_orchestration(
    state: &AppState,
    request_id: Uuid,
    sid: &str,
    conversation: Vec<Message>,
    model_id: String,
    principal: Option<Principal>,
) -> Response {
    let context = state.context.clone();
    let connector = Arc::clone(&state.connector);
    let orchestrator_config: Arc<OrchestratorConfig> = Arc::clone(&state.orchestrator_config);
    let span = tracing::info_span!("orchestration", sid = %sid);

    let work: TaskFuture = Box::pin(
        async move {
            let result = gateway_orchestrator::run_orchestration(
                &context,
                &connector,
                &conversation,
                &model_id,
                principal.as_ref(),
                &orchestrator_config,
            )
            .await;
            Ok(result)
        }
        .instrument(span),
    );

    accept_task(state, request_id, sid, work).await
}

async fn enqueue_direct(state: &AppState, request_id: Uuid, sid: &str, model_id: String, conversation: Vec<Message>) -> Response {
    let connector = Arc::clone(&state.connector);
    let primary_backend_name = state.settings.primary_backend_name.clone();

    let work: TaskFuture = Box::pin(async move {
        connector
            .chat_completion(&model_id, primary_backend_name.as_deref(), conversation, false)
            .await
            .map(|response| {
                response
                    .choices
                    .first()
                    .map(|choice| value_as_text(&choice.message.content))
                    .unwrap_or_default()
            })
            .map_err(|e| e.to_string())
    });

    accept_task(state, request_id, sid, work).await
}

async fn accept_task(state: &AppState, request_id: Uuid, sid: &str, work: TaskFuture) -> Response {
    match state.queue.enqueue(work).await {
        Ok(task_id) => {
            let accepted = TaskAcceptedResponse {
                task_id,
                status_endpoint: format!("/v1/tasks/status/{task_id}"),
                message: "request accepted for processing",
            };
            let body = serde_json::to_value(&accepted).unwrap_or(Value::Null);
            audit::log_response(request_id, sid, &body, StatusCode::ACCEPTED.as_u16());
            metrics::record_request("/v1/chat/completions", StatusCode::ACCEPTED.as_u16());
            (StatusCode::ACCEPTED, Json(accepted)).into_response()
        }
        Err(e) => error_response(request_id, sid, StatusCode::INTERNAL_SERVER_ERROR, CoreError::Internal(e.to_string())),
    }
}

async fn stream_direct(state: &AppState, request_id: Uuid, sid: &str, model_id: String, conversation: Vec<Message>) -> Response {
    let primary_backend_name = state.settings.primary_backend_name.clone();
    match state
        .connector
        .chat_completion_stream(&model_id, primary_backend_name.as_deref(), &conversation)
        .await
    {
        Ok(chunks) => {
            audit::log_response(request_id, sid, &serde_json::json!({"streaming": true}), StatusCode::OK.as_u16());
            metrics::record_request("/v1/chat/completions", StatusCode::OK.as_u16());
            Sse::new(make_sse_stream(chunks)).into_response()
        }
        Err(e) => error_response(request_id, sid, StatusCode::BAD_GATEWAY, CoreError::ConnectionFailed(e.to_string())),
    }
}

async fn task_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let record = state.queue.get(id);
    let response = gateway_core::TaskStatusResponse::from(&record);
    let status = match response.status {
        gateway_core::TaskStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(response))
}

type Response = axum::response::Response;

fn error_response(request_id: Uuid, sid: &str, status: StatusCode, error: CoreError) -> Response {
    let body = serde_json::to_value(error.to_envelope()).unwrap_or(Value::Null);
    audit::log_response(request_id, sid, &body, status.as_u16());
    metrics::record_request("/v1/chat/completions", status.as_u16());
    (status, Json(body)).into_response()
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers.iter() {
        let rendered = if name.as_str().eq_ignore_ascii_case("authorization") {
            "[redacted]".to_string()
        } else {
            value.to_str().unwrap_or("<non-utf8>").to_string()
        };
        map.insert(name.as_str().to_string(), Value::String(rendered));
    }
    Value::Object(map)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
