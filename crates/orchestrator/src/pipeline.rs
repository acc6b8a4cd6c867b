//! The agentic orchestration pipeline (C7): decision -> tool execution
//! -> synthesis over a conversation, per spec 4.3. This is the body of
//! the task the HTTP surface enqueues for every agentic request; it has
//! no observable side effect outside the task substrate -- streaming to
//! clients lives entirely in `gateway-server`, not here.

use crate::prompts::{build_decision_prompt, build_synthesis_prompt, time_context_line, HARD_CODED_APOLOGY, UI_INTERNAL_TASK_PREFIX};
use gateway_core::tool::{DecisionAction, PROCEED_TO_SYNTHESIS};
use gateway_core::{Content, Conversation, GatewayContext, Message, Principal, Role};
use gateway_llm::Connector;
use gateway_tools::ToolExecutor;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("decision LLM call failed: {0}")]
    Decision(String),
    #[error("synthesis LLM call failed: {0}")]
    Synthesis(String),
}

/// Settings the pipeline needs that live outside `GatewayContext`
/// (which only carries boot-time, process-wide state) -- mirrors the
/// subset of `GatewaySettings` the C7 steps actually consume.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub routing_backend_name: Option<String>,
    pub primary_backend_name: Option<String>,
    pub searxng_base_url: String,
    pub time_zone: String,
    pub system_admin_email: Option<String>,
}

/// Run the decision -> tool -> synthesis pipeline and return the
/// user-visible answer. Never panics and never returns an error: every
/// failure mode resolves to an apology string per spec 4.3 step 9.
pub async fn run_orchestration(
    context: &GatewayContext,
    connector: &Connector,
    conversation: &Conversation,
    model_id: &str,
    user_info: Option<&Principal>,
    config: &OrchestratorConfig,
) -> String {
    // Step 1: extract the user question from the last message.
    let Some(last) = conversation.last() else {
        return no_question_apology();
    };
    if last.role != Role::User {
        return no_question_apology();
    }
    let user_question = last.content.as_text();

    // Step 2: UI-internal title/tag requests must never trigger tools.
    let bypass_routing = user_question.starts_with(UI_INTERNAL_TASK_PREFIX);

    // Step 3: routing model selection.
    let decision_model_id = routing_model_id(context, config, model_id);

    // Steps 4-5: decision call + validation.
    let decision = if bypass_routing {
        DecisionAction::RespondDirectly
    } else {
        match decide(context, connector, config, &user_question, &decision_model_id).await {
            Ok(action) => validate_decision(context, action),
            Err(e) => {
                tracing::warn!(error = %e, "decision call failed, responding directly without tool context");
                DecisionAction::RespondDirectly
            }
        }
    };

    // Step 6: tool execution.
    let tool_output = match decision {
        DecisionAction::CallTool {
            tool_name,
            parameters,
        } => {
            let params = parameters.unwrap_or_default();
            let executor = ToolExecutor::new(&context.tools, context.http_client.clone(), config.searxng_base_url.clone());
            Some(executor.execute(&tool_name, &params, &user_question).await)
        }
        DecisionAction::RespondDirectly => None,
    };

    // Step 7: synthesis prompt construction.
    let persona_prompt = if tool_output.is_none() {
        load_persona_prompt(user_info).await
    } else {
        None
    };
    let synthesis_system_prompt = build_synthesis_prompt(
        &config.time_zone,
        tool_output.as_deref(),
        persona_prompt.as_deref(),
    );
    let synthesis_conversation = inject_system_prompt(conversation.clone(), synthesis_system_prompt);

    // Step 8-9: synthesis call, with apology fallback on failure.
    synthesize(connector, config, model_id, synthesis_conversation).await
}

/// `<routing_backend>/<default_model of that backend>` when a routing
/// backend is configured and actually has a default model set;
/// otherwise fall back to the caller's own model id (spec 4.3 step 3).
fn routing_model_id(context: &GatewayContext, config: &OrchestratorConfig, fallback_model_id: &str) -> String {
    if let Some(routing_backend) = &config.routing_backend_name {
        if let Some(backend) = context.backends.get(routing_backend) {
            if let Some(default_model) = &backend.default_model {
                return format!("{routing_backend}/{default_model}");
            }
        }
        tracing::warn!(
            routing_backend,
            "routing_backend_name configured but has no default_model; using caller's model"
        );
    }
    fallback_model_id.to_string()
}

async fn decide(
    context: &GatewayContext,
    connector: &Connector,
    config: &OrchestratorConfig,
    user_question: &str,
    decision_model_id: &str,
) -> Result<DecisionAction, OrchestratorError> {
    let system_prompt = build_decision_prompt(&context.tools);
    let convo = vec![Message::system(system_prompt), Message::user(user_question.to_string())];
    let response = connector
        .chat_completion(decision_model_id, config.primary_backend_name.as_deref(), convo, true)
        .await
        .map_err(|e| OrchestratorError::Decision(e.to_string()))?;

    let raw_content = response
        .choices
        .first()
        .map(|choice| choice.message.content.clone())
        .unwrap_or(Value::Null);
    let normalized = normalize_decision_keys(raw_content);
    serde_json::from_value(normalized).map_err(|e| OrchestratorError::Decision(e.to_string()))
}

/// Normalize alternative key names a routing LLM sometimes emits
/// (observed: French `outil`/`paramètres`) onto the canonical English
/// field names before deserializing (spec 4.3 step 5).
fn normalize_decision_keys(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        if let Some(v) = map.remove("outil") {
            map.entry("tool_name").or_insert(v);
        }
        for alt in ["paramètres", "parametres"] {
            if let Some(v) = map.remove(alt) {
                map.entry("parameters").or_insert(v);
            }
        }
    }
    value
}

/// Guard against decision LLM hallucination (spec scenario S4): an
/// unknown tool name, the reserved `proceed_to_synthesis` pseudo-tool,
/// missing `parameters`, or `parameters` that don't match the tool's
/// `parameters_schema` all force `respond_directly`.
fn validate_decision(context: &GatewayContext, action: DecisionAction) -> DecisionAction {
    match action {
        DecisionAction::CallTool {
            tool_name,
            parameters,
        } => {
            let Some(params) = parameters.as_ref() else {
                return DecisionAction::RespondDirectly;
            };
            if tool_name == PROCEED_TO_SYNTHESIS {
                return DecisionAction::RespondDirectly;
            }
            let Some(tool) = context.tools.get(&tool_name) else {
                return DecisionAction::RespondDirectly;
            };
            if !tool.validate_parameters(params) {
                tracing::warn!(tool = %tool_name, "decision LLM proposed parameters that don't match the tool's schema");
                return DecisionAction::RespondDirectly;
            }
            DecisionAction::CallTool {
                tool_name,
                parameters,
            }
        }
        other => other,
    }
}

async fn load_persona_prompt(user_info: Option<&Principal>) -> Option<String> {
    let path = user_info?.persona_prompt_file.as_deref()?;
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path, error = %e, "failed to load persona prompt file, falling back to generic assistant");
            None
        }
    }
}

/// Replace the conversation's first system message with `prompt`, or
/// prepend one if it has none -- the caller's input is deep-copied
/// (`.clone()`'d by `run_orchestration`) before this mutation.
fn inject_system_prompt(mut conversation: Conversation, prompt: String) -> Conversation {
    if let Some(first) = conversation.first_mut() {
        if first.role == Role::System {
            first.content = Content::Text(prompt);
            return conversation;
        }
    }
    let mut with_system = Vec::with_capacity(conversation.len() + 1);
    with_system.push(Message::system(prompt));
    with_system.extend(conversation);
    with_system
}

async fn synthesize(
    connector: &Connector,
    config: &OrchestratorConfig,
    model_id: &str,
    conversation: Conversation,
) -> String {
    match connector
        .chat_completion(model_id, config.primary_backend_name.as_deref(), conversation, false)
        .await
    {
        Ok(response) => {
            let content = response
                .choices
                .first()
                .map(|choice| value_as_text(&choice.message.content))
                .unwrap_or_default();
            if content.trim().is_empty() {
                empty_synthesis_apology()
            } else {
                content
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "synthesis call failed, attempting apology generation");
            generate_apology(connector, config, model_id).await
        }
    }
}

async fn generate_apology(connector: &Connector, config: &OrchestratorConfig, model_id: &str) -> String {
    let admin_contact = config
        .system_admin_email
        .as_deref()
        .unwrap_or("the system administrator");
    let prompt = format!(
        "{}\n\nThe user's request could not be completed due to a technical problem. \
         Write a brief, polite apology explaining this, and mention that if the problem \
         persists they can contact {admin_contact}. Do not mention tools, backends, or \
         internal error details.",
        time_context_line(&config.time_zone),
    );
    let convo = vec![Message::system(prompt), Message::user("Generate the apology now.")];
    match connector
        .chat_completion(model_id, config.primary_backend_name.as_deref(), convo, false)
        .await
    {
        Ok(response) => {
            let text = response
                .choices
                .first()
                .map(|choice| value_as_text(&choice.message.content))
                .unwrap_or_default();
            if text.trim().is_empty() {
                HARD_CODED_APOLOGY.to_string()
            } else {
                text
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "secondary apology generation also failed, using hard-coded apology");
            HARD_CODED_APOLOGY.to_string()
        }
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn no_question_apology() -> String {
    "I'm sorry, I couldn't find a question to answer in your message.".to_string()
}

fn empty_synthesis_apology() -> String {
    "I'm sorry, I don't have a good answer for that right now.".to_string()
}
