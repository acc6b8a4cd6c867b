//! Tool definitions loaded at boot (C4). Dynamic dispatch over tool
//! types is modeled as a tagged enum with one variant per execution
//! strategy rather than a string-keyed `type` field, per the tagged-
//! variant guidance for this subsystem.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-Schema-like description of the tool's parameters, shown to
    /// the decision LLM and used to generate worked examples.
    pub parameters_schema: serde_json::Value,
    #[serde(flatten)]
    pub execution_details: ToolExecutionDetails,
}

impl ToolDefinition {
    /// Validate a decision LLM's proposed `parameters` against this
    /// tool's `parameters_schema`, guarding against a hallucinated or
    /// malformed call before it ever reaches the executor. A
    /// `parameters_schema` that itself fails to compile is a
    /// configuration problem, not a caller error, so it's logged and
    /// treated as permissive rather than rejecting every call.
    pub fn validate_parameters(&self, parameters: &ToolParameters) -> bool {
        let instance = serde_json::Value::Object(parameters.clone());
        match jsonschema::validator_for(&self.parameters_schema) {
            Ok(validator) => validator.is_valid(&instance),
            Err(e) => {
                tracing::warn!(tool = %self.name, error = %e, "parameters_schema failed to compile, skipping validation");
                true
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolExecutionDetails {
    InternalFunction {
        /// Well-known name dispatched in `gateway_tools::executor`:
        /// `search_web` or `read_webpage`.
        function_name: String,
    },
    ApiCall {
        url_template: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default = "default_api_call_timeout")]
        timeout_seconds: u64,
    },
    SearchAndReadWebpage {
        query_template: String,
        #[serde(default = "default_pages_to_read")]
        pages_to_read: usize,
    },
    UrlFromTemplate {
        query_template: String,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_api_call_timeout() -> u64 {
    15
}

fn default_pages_to_read() -> usize {
    1
}

/// Parameters passed by the decision LLM to a tool invocation: an
/// arbitrary JSON object, since schema per tool varies.
pub type ToolParameters = serde_json::Map<String, serde_json::Value>;

/// The decision LLM's proposed action, as parsed from its JSON-mode
/// response (spec 4.3 step 4-5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionAction {
    CallTool {
        tool_name: String,
        #[serde(default)]
        parameters: Option<ToolParameters>,
    },
    RespondDirectly,
}

/// Name reserved for the zero-parameter pseudo-tool advertised to the
/// decision LLM meaning "no tool needed, answer directly." It is never
/// present in the executable registry; decision validation treats it
/// the same as an explicit `respond_directly` action.
pub const PROCEED_TO_SYNTHESIS: &str = "proceed_to_synthesis";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_action_call_tool_parses() {
        let json = r#"{"action":"call_tool","tool_name":"search_web","parameters":{"query":"rust"}}"#;
        let action: DecisionAction = serde_json::from_str(json).unwrap();
        match action {
            DecisionAction::CallTool {
                tool_name,
                parameters,
            } => {
                assert_eq!(tool_name, "search_web");
                assert!(parameters.is_some());
            }
            _ => panic!("expected CallTool"),
        }
    }

    #[test]
    fn decision_action_respond_directly_parses() {
        let json = r#"{"action":"respond_directly"}"#;
        let action: DecisionAction = serde_json::from_str(json).unwrap();
        assert!(matches!(action, DecisionAction::RespondDirectly));
    }

    #[test]
    fn api_call_tool_definition_round_trips() {
        let def = ToolDefinition {
            name: "get_weather".into(),
            description: "Fetch weather data".into(),
            parameters_schema: serde_json::json!({"type": "object"}),
            execution_details: ToolExecutionDetails::ApiCall {
                url_template: "https://api.weather.test/{city}".into(),
                method: default_method(),
                headers: HashMap::new(),
                timeout_seconds: default_api_call_timeout(),
            },
        };
        let json = serde_json::to_string(&def).unwrap();
        let back: ToolDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "get_weather");
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".into(),
            description: "Fetch weather data".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"],
            }),
            execution_details: ToolExecutionDetails::ApiCall {
                url_template: "https://api.weather.test/{city}".into(),
                method: default_method(),
                headers: HashMap::new(),
                timeout_seconds: default_api_call_timeout(),
            },
        }
    }

    #[test]
    fn validate_parameters_accepts_matching_shape() {
        let tool = weather_tool();
        let mut params = ToolParameters::new();
        params.insert("city".into(), serde_json::json!("Paris"));
        assert!(tool.validate_parameters(&params));
    }

    #[test]
    fn validate_parameters_rejects_missing_required_field() {
        let tool = weather_tool();
        let params = ToolParameters::new();
        assert!(!tool.validate_parameters(&params));
    }

    #[test]
    fn validate_parameters_rejects_wrong_type() {
        let tool = weather_tool();
        let mut params = ToolParameters::new();
        params.insert("city".into(), serde_json::json!(42));
        assert!(!tool.validate_parameters(&params));
    }

    #[test]
    fn uncompilable_schema_is_treated_as_permissive() {
        let mut tool = weather_tool();
        // `properties` must be an object per JSON Schema; this value
        // fails to compile into a validator at all.
        tool.parameters_schema = serde_json::json!({"type": "object", "properties": "not-an-object"});
        let mut params = ToolParameters::new();
        params.insert("city".into(), serde_json::json!("Paris"));
        assert!(tool.validate_parameters(&params));
    }
}
