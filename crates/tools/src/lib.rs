//! Built-in tool implementations for Switchboard.
//!
//! Tools give the agent the ability to act in the world: search the web,
//! fetch pages, read and write files, convert units. Each tool is a pure
//! function from JSON arguments to a JSON-serializable result; side
//! effects stay inside the handler.

pub mod fetch_page;
pub mod file_read;
pub mod file_write;
pub mod unit_convert;
pub mod web_search;

use std::sync::Arc;

use switchboard_core::error::ToolError;
use switchboard_core::tool::ToolRegistry;

/// Create a registry with all built-in tools.
///
/// File read/write refuse sensitive paths (~/.ssh, /etc/shadow, etc.)
/// by default.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(web_search::WebSearchTool))?;
    registry.register(Arc::new(fetch_page::FetchPageTool::new()))?;
    registry.register(Arc::new(file_read::FileReadTool::new()))?;
    registry.register(Arc::new(file_write::FileWriteTool::new()))?;
    registry.register(Arc::new(unit_convert::UnitConvertTool))?;
    Ok(registry)
}
