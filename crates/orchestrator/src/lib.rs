//! The agentic orchestration pipeline (C7): decision LLM, tool
//! execution, synthesis LLM, plus the periodic model catalog refresh
//! job (C8) that keeps `gateway_core::CatalogCache` warm.

pub mod catalog_refresh;
pub mod pipeline;
pub mod prompts;

pub use catalog_refresh::refresh_catalog;
pub use pipeline::{run_orchestration, OrchestratorConfig, OrchestratorError};
