//! The LLM Connector (C3): model-id routing, per-backend client
//! construction, multimodal image inlining, JSON-mode normalization,
//! streaming, and failover across backends.

pub mod connector;
pub mod multimodal;
pub mod streaming;
pub mod wire;

pub use connector::{resolve_model_id, Connector, ConnectorError, HighAvailabilityStrategy, ResolvedRequest};
pub use multimodal::{inline_remote_images, MultimodalError};
pub use streaming::{parse_sse_chunks, ChunkStream};
