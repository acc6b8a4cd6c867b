//! Multimodal image inlining: fetch remote `image_url` parts and
//! replace them with `data:` URIs before the message ever reaches an
//! upstream backend, matching
//! `original_source/app/llm_connector.py::_encode_image_url`.

use base64::Engine;
use gateway_core::message::{Content, ContentPart};
use gateway_core::Conversation;
use std::time::Duration;

const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const IMAGE_FETCH_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; harpou-ai-gateway/1.0; +https://example.invalid)";

#[derive(Debug, thiserror::Error)]
pub enum MultimodalError {
    #[error("failed to fetch image at {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Walk every message and inline any remote `image_url` part as a
/// `data:` URI. Returns whether any substitution occurred, so the
/// caller can decide to disable JSON mode (spec 4.1: multimodal
/// substitution and JSON mode are incompatible upstream).
///
/// Idempotent: a part whose URL is already a `data:` URI is left
/// untouched (spec testable property 4).
pub async fn inline_remote_images(
    client: &reqwest::Client,
    conversation: &mut Conversation,
) -> Result<bool, MultimodalError> {
    let mut any_substituted = false;
    for message in conversation.iter_mut() {
        if let Content::Parts(parts) = &mut message.content {
            for part in parts.iter_mut() {
                if let ContentPart::ImageUrl { image_url } = part {
                    if image_url.url.starts_with("http://") || image_url.url.starts_with("https://") {
                        image_url.url = fetch_and_encode(client, &image_url.url).await?;
                        any_substituted = true;
                    }
                }
            }
        }
    }
    Ok(any_substituted)
}

async fn fetch_and_encode(client: &reqwest::Client, url: &str) -> Result<String, MultimodalError> {
    let bytes = fetch_with_one_retry(client, url).await?;
    let mime = mime_guess::from_path(url)
        .first_raw()
        .unwrap_or("application/octet-stream");
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

async fn fetch_with_one_retry(
    client: &reqwest::Client,
    url: &str,
) -> Result<bytes::Bytes, MultimodalError> {
    match fetch_once(client, url).await {
        Ok(bytes) => Ok(bytes),
        Err(_first_err) => fetch_once(client, url)
            .await
            .map_err(|source| MultimodalError::Fetch {
                url: url.to_string(),
                source,
            }),
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<bytes::Bytes, reqwest::Error> {
    client
        .get(url)
        .timeout(IMAGE_FETCH_TIMEOUT)
        .header("User-Agent", IMAGE_FETCH_USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await
}
