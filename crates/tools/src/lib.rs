//! The Tool Registry & Executor (C4) and Web Fetch Helpers (C5): a
//! declarative tool registry driving four execution strategies
//! (internal function, templated HTTP, search + read, URL-from-
//! template), backed by a SearXNG search helper and an HTML page
//! reader.

pub mod api_call;
pub mod executor;
pub mod web_reader;
pub mod web_search;

pub use executor::ToolExecutor;
pub use web_reader::read_webpage;
pub use web_search::search_web;
