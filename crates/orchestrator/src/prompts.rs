//! System-prompt construction for the decision and synthesis steps
//! (spec 4.3 steps 4 and 7).

use chrono::Utc;
use gateway_core::ToolRegistry;

pub const UI_INTERNAL_TASK_PREFIX: &str = "### Task:";

pub const GENERIC_ASSISTANT_PROMPT: &str = "You are a helpful assistant.";

pub const HARD_CODED_APOLOGY: &str =
    "I'm sorry, I wasn't able to generate a response right now. Please try again shortly.";

/// Enumerate the tool registry and build a decision system prompt that
/// instructs the routing LLM to reply with exactly one JSON object:
/// `{"action":"call_tool","tool_name":...,"parameters":{...}}` or
/// `{"action":"respond_directly"}`.
pub fn build_decision_prompt(tools: &ToolRegistry) -> String {
    let mut prompt = String::from(
        "You are a routing assistant. Given the user's question, decide whether \
         a tool call is needed to answer it accurately. Respond with ONLY a JSON \
         object, no other text.\n\n\
         If a tool is needed, respond with:\n\
         {\"action\": \"call_tool\", \"tool_name\": \"<name>\", \"parameters\": {...}}\n\n\
         If no tool is needed, respond with:\n\
         {\"action\": \"respond_directly\"}\n\n\
         Available tools:\n",
    );
    for tool in tools.iter() {
        prompt.push_str(&format!(
            "- {}: {}\n  parameters schema: {}\n  example: {{\"action\": \"call_tool\", \"tool_name\": \"{}\", \"parameters\": {}}}\n",
            tool.name,
            tool.description,
            tool.parameters_schema,
            tool.name,
            example_parameters(&tool.parameters_schema),
        ));
    }
    prompt.push_str(&format!(
        "- {}: no external information is needed; answer directly.\n",
        gateway_core::PROCEED_TO_SYNTHESIS
    ));
    prompt
}

/// Produce a minimal, schema-conformant example value so the decision
/// prompt always shows a concretely-shaped `parameters` object instead
/// of an abstract schema description.
fn example_parameters(schema: &serde_json::Value) -> serde_json::Value {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return serde_json::json!({});
    };
    let mut example = serde_json::Map::new();
    for (key, spec) in properties {
        let placeholder = match spec.get("type").and_then(|t| t.as_str()) {
            Some("integer") | Some("number") => serde_json::Value::from(1),
            Some("boolean") => serde_json::Value::Bool(true),
            Some("array") => serde_json::Value::Array(vec![]),
            _ => serde_json::Value::String(format!("<{key}>")),
        };
        example.insert(key.clone(), placeholder);
    }
    serde_json::Value::Object(example)
}

/// Current local time line prepended to every synthesis prompt,
/// falling back to UTC if the configured zone name doesn't resolve.
pub fn time_context_line(time_zone: &str) -> String {
    match time_zone.parse::<chrono_tz::Tz>() {
        Ok(tz) => {
            let now = Utc::now().with_timezone(&tz);
            format!("Current date and time: {}", now.format("%Y-%m-%d %H:%M:%S %Z"))
        }
        Err(_) => {
            tracing::warn!(time_zone, "unknown time zone, falling back to UTC");
            format!("Current date and time (UTC): {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))
        }
    }
}

/// Build the synthesis system prompt body (spec 4.3 step 7), given
/// whether a tool was used (and its output), and the caller's persona
/// prompt if one applies.
pub fn build_synthesis_prompt(
    time_zone: &str,
    tool_output: Option<&str>,
    persona_prompt: Option<&str>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&time_context_line(time_zone));
    prompt.push('\n');
    prompt.push('\n');

    match tool_output {
        Some(output) => {
            prompt.push_str(
                "Use ONLY the research information below to answer the user's question. \
                 If the information needed is not present in the research, say so plainly \
                 rather than guessing.\n\n--- Research ---\n",
            );
            prompt.push_str(output);
        }
        None => match persona_prompt {
            Some(persona) => prompt.push_str(persona),
            None => prompt.push_str(GENERIC_ASSISTANT_PROMPT),
        },
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_prompt_mentions_proceed_to_synthesis() {
        let tools = ToolRegistry::new(vec![]);
        let prompt = build_decision_prompt(&tools);
        assert!(prompt.contains(gateway_core::PROCEED_TO_SYNTHESIS));
    }

    #[test]
    fn synthesis_prompt_with_tool_output_is_strict() {
        let prompt = build_synthesis_prompt("UTC", Some("research text"), None);
        assert!(prompt.contains("ONLY"));
        assert!(prompt.contains("research text"));
    }

    #[test]
    fn synthesis_prompt_falls_back_to_generic_assistant() {
        let prompt = build_synthesis_prompt("UTC", None, None);
        assert!(prompt.contains(GENERIC_ASSISTANT_PROMPT));
    }

    #[test]
    fn unknown_time_zone_falls_back_to_utc() {
        let line = time_context_line("Mars/Olympus_Mons");
        assert!(line.contains("UTC"));
    }
}
