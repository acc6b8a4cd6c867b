//! HTML-to-text page reader (C5), grounded on
//! `original_source/app/tools/web_reader.py`. Never raises: failures
//! come back as a descriptive string so the orchestrator can feed them
//! to synthesis as diagnostic context instead of crashing.

use scraper::{Html, Selector};
use std::time::Duration;

const READ_TIMEOUT: Duration = Duration::from_secs(15);
const READER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fetch `url` and return its cleaned text content, or a descriptive
/// error string -- this function does not return `Result` because a
/// tool's output is always text, success or failure alike (spec 4.2:
/// "Tool exceptions are caught and converted to an error string").
pub async fn read_webpage(client: &reqwest::Client, url: &str) -> String {
    tracing::info!(url, "reading web page");
    let response = match client
        .get(url)
        .timeout(READ_TIMEOUT)
        .header("User-Agent", READER_USER_AGENT)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => return format!("Error: unable to access the URL. Details: {e}"),
    };

    let response = match response.error_for_status() {
        Ok(r) => r,
        Err(e) => return format!("Error: unable to access the URL. Details: {e}"),
    };

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => return format!("Unexpected error while reading the page. Details: {e}"),
    };

    let cleaned = extract_text(&body);
    if cleaned.trim().is_empty() {
        "The page content is empty or could not be read.".to_string()
    } else {
        cleaned
    }
}

/// Strip `<script>`/`<style>` and collapse whitespace, mirroring the
/// BeautifulSoup cleanup in the original reader.
fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let excluded = Selector::parse("script, style").unwrap();
    let excluded_ids: std::collections::HashSet<_> = document
        .select(&excluded)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let root = document.root_element();
    let mut text_fragments = Vec::new();
    for node in root.descendants() {
        if excluded_ids.contains(&node.id()) {
            continue;
        }
        if let Some(text_node) = node.value().as_text() {
            let trimmed = text_node.trim();
            if !trimmed.is_empty() {
                text_fragments.push(trimmed.to_string());
            }
        }
    }

    text_fragments.join("\n")
}
