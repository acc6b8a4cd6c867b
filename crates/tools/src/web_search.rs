//! SearXNG-backed web search (C5), grounded on
//! `original_source/app/tools/web_search.py`. Splits results into a
//! "to-read" set (fetched in full, in parallel) and an "extra
//! snippets" set (title/snippet only), then assembles a single text
//! context labeled by source URL -- concatenated in **submission
//! order**, not completion order (spec 5).

use crate::web_reader::read_webpage;
use futures::future::join_all;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize, Clone)]
struct SearxngResult {
    url: String,
    title: String,
    #[serde(default)]
    content: String,
}

/// Query SearXNG and build a labeled text context from the top results.
/// Never returns an error: any failure (network, parse, empty results)
/// yields an empty string, matching the original's
/// "catch everything, return `[]` on failure" policy.
pub async fn search_web(
    client: &reqwest::Client,
    searxng_base_url: &str,
    query: &str,
    pages_to_read: usize,
    excerpts_to_show: usize,
) -> String {
    let results = match query_searxng(client, searxng_base_url, query).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(query, error = %e, "web search failed");
            return String::new();
        }
    };

    if results.is_empty() {
        return String::new();
    }

    let to_read: Vec<&SearxngResult> = results.iter().take(pages_to_read).collect();
    let extra: Vec<&SearxngResult> = results
        .iter()
        .skip(pages_to_read)
        .take(excerpts_to_show)
        .collect();

    // Fetch all "to-read" pages in parallel, but `join_all` preserves
    // submission order in its output vector regardless of completion
    // order, so the zip below stays correctly labeled.
    let page_contents = join_all(to_read.iter().map(|r| read_webpage(client, &r.url))).await;

    let mut sections = Vec::new();
    for (result, content) in to_read.iter().zip(page_contents.into_iter()) {
        sections.push(format!("Source: {}\n{}", result.url, content));
    }
    for result in &extra {
        sections.push(format!("Source: {} ({})\n{}", result.url, result.title, result.content));
    }

    sections.join("\n\n---\n\n")
}

async fn query_searxng(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Vec<SearxngResult>, reqwest::Error> {
    let url = format!("{}/search", base_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[("q", query), ("format", "json")])
        .send()
        .await?
        .error_for_status()?;
    let parsed: SearxngResponse = response.json().await?;
    Ok(parsed.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn assembles_context_in_submission_order() {
        let search_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"url": format!("{}/a", search_server.uri()), "title": "A", "content": "snippet a"},
                    {"url": format!("{}/b", search_server.uri()), "title": "B", "content": "snippet b"},
                    {"url": "https://extra.example.com/c", "title": "C", "content": "snippet c"},
                ]
            })))
            .mount(&search_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Page A body</body></html>"))
            .mount(&search_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Page B body</body></html>"))
            .mount(&search_server)
            .await;

        let client = reqwest::Client::new();
        let context = search_web(&client, &search_server.uri(), "rust", 2, 1).await;

        let a_pos = context.find("Page A body").unwrap();
        let b_pos = context.find("Page B body").unwrap();
        let c_pos = context.find("snippet c").unwrap();
        assert!(a_pos < b_pos);
        assert!(b_pos < c_pos);
    }

    #[tokio::test]
    async fn search_failure_returns_empty_string_not_error() {
        let client = reqwest::Client::new();
        let context = search_web(&client, "http://127.0.0.1:1", "rust", 1, 1).await;
        assert_eq!(context, "");
    }
}
