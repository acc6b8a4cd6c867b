//! SSE stream assembly for the direct-proxy streaming path (spec 4.6
//! step 5): wraps a `gateway_llm::ChunkStream` in axum's `Event` type,
//! forwarding each upstream chunk verbatim and terminating with the
//! literal `data: [DONE]` line, mirroring
//! `other_examples/…SerialAgent…openai_compat.rs`'s `make_openai_sse_stream`.

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use gateway_llm::ChunkStream;

/// Turn a parsed upstream chunk stream into an SSE event stream. A
/// mid-stream upstream error is surfaced as one final `data: {error…}`
/// event before the `[DONE]` terminator, rather than dropping the
/// connection silently.
pub fn make_sse_stream(mut chunks: ChunkStream) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(next) = chunks.next().await {
            match next {
                Ok(chunk) => {
                    if let Ok(data) = serde_json::to_string(&chunk) {
                        yield Ok(Event::default().data(data));
                    }
                }
                Err(e) => {
                    let err = serde_json::json!({
                        "error": { "message": e.to_string(), "type": "upstream_error" }
                    });
                    yield Ok(Event::default().data(err.to_string()));
                    break;
                }
            }
        }
        yield Ok(Event::default().data("[DONE]"));
    }
}
