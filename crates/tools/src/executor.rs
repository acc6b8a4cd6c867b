//! Tool execution (C4): dispatches a decision LLM's `{tool_name,
//! parameters}` against the tool registry, following the declarative
//! `execution_details` tagged variant. Unknown tool/type and any
//! execution failure are converted into a diagnostic string rather
//! than propagated -- the orchestrator must tolerate tool output being
//! an error description.

use crate::api_call::execute_api_call;
use crate::web_reader::read_webpage;
use crate::web_search::search_web;
use futures::future::join_all;
use gateway_core::tool::{ToolExecutionDetails, ToolParameters};
use gateway_core::ToolRegistry;

/// Keywords that, for the `get_detailed_weather` tool specifically,
/// trigger an auxiliary search enriching the weather context (spec
/// 4.2's "enrichment rule").
const WEATHER_ENRICHMENT_KEYWORDS: &[&str] = &[
    "insect", "pollen", "uv", "air quality", "humidex",
];
const WEATHER_TOOL_NAME: &str = "get_detailed_weather";

pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
    http_client: reqwest::Client,
    searxng_base_url: String,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(registry: &'a ToolRegistry, http_client: reqwest::Client, searxng_base_url: String) -> Self {
        Self {
            registry,
            http_client,
            searxng_base_url,
        }
    }

    /// Execute `tool_name` with `parameters` (and, for the weather
    /// enrichment rule, the original user question). Never fails: any
    /// error becomes part of the returned string.
    pub async fn execute(&self, tool_name: &str, parameters: &ToolParameters, user_question: &str) -> String {
        let Some(definition) = self.registry.get(tool_name) else {
            return format!("Error: unknown tool '{tool_name}'.");
        };

        match &definition.execution_details {
            ToolExecutionDetails::InternalFunction { function_name } => {
                self.execute_internal_function(function_name, parameters).await
            }
            ToolExecutionDetails::ApiCall {
                url_template,
                method,
                headers,
                timeout_seconds,
            } => execute_api_call(&self.http_client, url_template, method, headers, *timeout_seconds, parameters)
                .await
                .unwrap_or_else(|e| format!("Error executing tool '{tool_name}': {e}")),
            ToolExecutionDetails::SearchAndReadWebpage {
                query_template,
                pages_to_read,
            } => {
                self.execute_search_and_read(tool_name, query_template, *pages_to_read, parameters, user_question)
                    .await
            }
            ToolExecutionDetails::UrlFromTemplate { query_template } => {
                let url = render_query_template(query_template, parameters, &self.searxng_base_url);
                read_webpage(&self.http_client, &url).await
            }
        }
    }

    async fn execute_internal_function(&self, function_name: &str, parameters: &ToolParameters) -> String {
        match function_name {
            "search_web" => {
                let query = parameters
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let pages_to_read = parameters
                    .get("pages_to_read")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as usize;
                let excerpts_to_show = parameters
                    .get("excerpts_to_show")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize;
                search_web(&self.http_client, &self.searxng_base_url, query, pages_to_read, excerpts_to_show).await
            }
            "read_webpage" => self.execute_read_webpage(parameters).await,
            other => format!("Error: unknown internal function '{other}'."),
        }
    }

    async fn execute_read_webpage(&self, parameters: &ToolParameters) -> String {
        let urls: Vec<String> = match parameters.get("url") {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => return "Error: 'url' parameter is required (string or list of strings).".to_string(),
        };

        let contents = join_all(urls.iter().map(|u| read_webpage(&self.http_client, u))).await;
        urls.iter()
            .zip(contents)
            .map(|(url, content)| format!("Source: {url}\n{content}"))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    async fn execute_search_and_read(
        &self,
        tool_name: &str,
        query_template: &str,
        pages_to_read: usize,
        parameters: &ToolParameters,
        user_question: &str,
    ) -> String {
        let query = render_query_template(query_template, parameters, &self.searxng_base_url);
        let mut context = search_web(&self.http_client, &self.searxng_base_url, &query, pages_to_read, 0).await;

        if tool_name == WEATHER_TOOL_NAME && mentions_enrichment_keyword(user_question) {
            let enrichment_query = format!("{query} air quality pollen UV index");
            let enrichment = search_web(&self.http_client, &self.searxng_base_url, &enrichment_query, 0, 3).await;
            if !enrichment.is_empty() {
                context.push_str("\n\n--- Additional environmental context ---\n\n");
                context.push_str(&enrichment);
            }
        }

        context
    }
}

fn mentions_enrichment_keyword(user_question: &str) -> bool {
    let lowered = user_question.to_lowercase();
    WEATHER_ENRICHMENT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Format a query/URL template against tool parameters and a handful
/// of global substitutions (spec 4.2: "with access to global
/// substitutions such as {SEARXNG_BASE_URL}").
fn render_query_template(template: &str, parameters: &ToolParameters, searxng_base_url: &str) -> String {
    let mut rendered = template.replace("{SEARXNG_BASE_URL}", searxng_base_url);
    for (key, value) in parameters {
        let placeholder = format!("{{{key}}}");
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&placeholder, &raw);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::ToolDefinition;

    fn registry_with(tools: Vec<ToolDefinition>) -> ToolRegistry {
        ToolRegistry::new(tools)
    }

    #[tokio::test]
    async fn unknown_tool_yields_diagnostic_string() {
        let registry = registry_with(vec![]);
        let executor = ToolExecutor::new(&registry, reqwest::Client::new(), "http://localhost:8080".into());
        let result = executor
            .execute("read_my_mind", &ToolParameters::new(), "anything")
            .await;
        assert!(result.contains("unknown tool"));
    }

    #[test]
    fn render_query_template_substitutes_global_and_param() {
        let mut params = ToolParameters::new();
        params.insert("city".to_string(), serde_json::Value::String("Montreal".into()));
        let rendered = render_query_template(
            "{SEARXNG_BASE_URL}/search?city={city}",
            &params,
            "http://searx.local",
        );
        assert_eq!(rendered, "http://searx.local/search?city=Montreal");
    }

    #[test]
    fn weather_enrichment_keyword_detection_is_case_insensitive() {
        assert!(mentions_enrichment_keyword("What is the POLLEN count today?"));
        assert!(!mentions_enrichment_keyword("Will it rain tomorrow?"));
    }
}
