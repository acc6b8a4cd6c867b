//! Core types shared across the gateway crates: messages, backend and
//! tool descriptors, principals, task records, the read-only registries
//! built at boot, and the `GatewayContext` that threads them through
//! the HTTP surface, the orchestrator and the task workers.

pub mod catalog;
pub mod context;
pub mod error;
pub mod message;
pub mod model;
pub mod principal;
pub mod registry;
pub mod task;
pub mod tool;

pub use catalog::CatalogCache;
pub use context::GatewayContext;
pub use error::{Error, ErrorBody, ErrorEnvelope, Result};
pub use message::{Content, ContentPart, Conversation, ImageUrl, Message, Role};
pub use model::{BackendDescriptor, BackendType, ModelDescriptor};
pub use principal::{Principal, RateLimitParseError, RateLimitPeriod, RateLimitSpec, PUBLIC_ACCESS_USERNAME};
pub use registry::{BackendRegistry, PrincipalMap, RegistryError, ToolRegistry};
pub use task::{TaskRecord, TaskState, TaskStatus, TaskStatusResponse};
pub use tool::{DecisionAction, ToolDefinition, ToolExecutionDetails, ToolParameters, PROCEED_TO_SYNTHESIS};
