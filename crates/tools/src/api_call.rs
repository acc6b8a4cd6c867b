//! Templated HTTP tool calls (C4 `api_call`): `{param}` placeholders in
//! `url_template` are URL-encoded before substitution; header values
//! support `$ENV_VAR` expansion so credentials flow from the process
//! environment rather than living in tool config.

use gateway_core::tool::ToolParameters;
use std::collections::HashMap;
use std::time::Duration;

/// Substitute `{param}` placeholders in `template` with URL-encoded
/// parameter values.
pub fn render_url_template(template: &str, parameters: &ToolParameters) -> String {
    let mut rendered = template.to_string();
    for (key, value) in parameters {
        let placeholder = format!("{{{key}}}");
        let raw = value_to_string(value);
        let encoded = url::form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>();
        rendered = rendered.replace(&placeholder, &encoded);
    }
    rendered
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Expand `$VAR_NAME` occurrences in a header value against the
/// process environment. Unresolvable variables are left verbatim
/// rather than causing the call to fail, since an unset credential
/// should surface as an upstream auth failure, not a tool crash.
pub fn expand_env_vars(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '$' {
            let mut name = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                result.push('$');
            } else {
                match std::env::var(&name) {
                    Ok(val) => result.push_str(&val),
                    Err(_) => {
                        result.push('$');
                        result.push_str(&name);
                    }
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[derive(Debug, thiserror::Error)]
pub enum ApiCallError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Execute a templated HTTP call and return the raw response body.
/// Errors are caught by the executor and turned into a diagnostic
/// string -- this function's `Result` is for that boundary, not a
/// promise that the orchestrator ever sees it directly.
pub async fn execute_api_call(
    client: &reqwest::Client,
    url_template: &str,
    method: &str,
    headers: &HashMap<String, String>,
    timeout_seconds: u64,
    parameters: &ToolParameters,
) -> Result<String, ApiCallError> {
    let url = render_url_template(url_template, parameters);
    let http_method: reqwest::Method = method.parse().unwrap_or(reqwest::Method::GET);

    let mut request = client
        .request(http_method, &url)
        .timeout(Duration::from_secs(timeout_seconds));
    for (name, value) in headers {
        request = request.header(name, expand_env_vars(value));
    }

    let response = request.send().await?;
    let response = response.error_for_status()?;
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, header};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(pairs: &[(&str, &str)]) -> ToolParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn url_template_substitutes_and_encodes() {
        let rendered = render_url_template(
            "https://api.test/{city}/weather",
            &params(&[("city", "New York")]),
        );
        assert_eq!(rendered, "https://api.test/New+York/weather");
    }

    #[test]
    fn env_var_expansion_resolves_set_variable() {
        std::env::set_var("GATEWAY_TEST_TOKEN", "secret123");
        let expanded = expand_env_vars("Bearer $GATEWAY_TEST_TOKEN");
        assert_eq!(expanded, "Bearer secret123");
        std::env::remove_var("GATEWAY_TEST_TOKEN");
    }

    #[test]
    fn env_var_expansion_leaves_unset_variable_verbatim() {
        std::env::remove_var("GATEWAY_TEST_UNSET");
        let expanded = expand_env_vars("Bearer $GATEWAY_TEST_UNSET");
        assert_eq!(expanded, "Bearer $GATEWAY_TEST_UNSET");
    }

    #[tokio::test]
    async fn executes_with_expanded_header() {
        let server = MockServer::start().await;
        std::env::set_var("GATEWAY_TEST_API_KEY", "abc123");
        Mock::given(method("GET"))
            .and(path("/v1/foo"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer $GATEWAY_TEST_API_KEY".to_string());

        let body = execute_api_call(
            &reqwest::Client::new(),
            &format!("{}/v1/foo", server.uri()),
            "GET",
            &headers,
            15,
            &params(&[]),
        )
        .await
        .unwrap();
        assert_eq!(body, "ok");
        std::env::remove_var("GATEWAY_TEST_API_KEY");
    }
}
