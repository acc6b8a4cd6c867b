//! Cancellable, lazy streaming of upstream SSE chunks. The returned
//! stream is single-pass and finite; dropping it (the axum response
//! future being cancelled on client disconnect) stops the underlying
//! `bytes_stream()` consumption promptly because nothing buffers ahead
//! of what has already been yielded.

use crate::wire::ChatCompletionChunk;
use crate::ConnectorError;
use futures::Stream;
use futures::StreamExt;

pub type ChunkStream = std::pin::Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, ConnectorError>> + Send>>;

/// Turn an upstream SSE byte stream into a stream of parsed chunks.
/// Upstream servers following the OpenAI contract frame each event as
/// `data: <json>\n\n`, terminated by a literal `data: [DONE]\n\n` line
/// which this function swallows rather than yielding.
pub fn parse_sse_chunks(response: reqwest::Response) -> ChunkStream {
    let byte_stream = response.bytes_stream();
    let line_stream = async_stream::stream! {
        let mut buf = String::new();
        futures::pin_mut!(byte_stream);
        while let Some(next) = byte_stream.next().await {
            let bytes = match next {
                Ok(b) => b,
                Err(e) => {
                    yield Err(ConnectorError::Connection(e.to_string()));
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(idx) = buf.find("\n\n") {
                let event = buf[..idx].to_string();
                buf.drain(..idx + 2);
                if let Some(data) = event.strip_prefix("data: ").or_else(|| event.strip_prefix("data:")) {
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<ChatCompletionChunk>(data) {
                        Ok(chunk) => yield Ok(chunk),
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to parse upstream SSE chunk, skipping");
                        }
                    }
                }
            }
        }
    };
    Box::pin(line_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_chunks_and_stops_at_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"id\":\"1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let mut stream = parse_sse_chunks(resp);
        let mut collected = Vec::new();
        while let Some(item) = stream.next().await {
            collected.push(item.unwrap());
        }
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].choices[0].delta.content.as_deref(), Some("hi"));
    }
}
