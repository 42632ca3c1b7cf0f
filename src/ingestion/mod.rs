//! Ingestion module for tool catalogs.
//!
//! This module turns externally discovered tool definitions into the
//! `ToolDefinition` records every ranker indexes.

pub mod atomizer;
pub mod types;

pub use atomizer::{atomize_tools, load_tools_file, AtomizerResult};
pub use types::{InputSchema, SearchResult, ToolDefinition};
