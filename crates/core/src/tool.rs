//! Tool trait and registry — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world: search
//! the web, fetch pages, read and write files, convert units. The dispatch
//! loop uses the registry to (1) describe the available tools to the LLM
//! and (2) look up and execute tools when the LLM requests them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ToolError;

/// A tool's schema, sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name (unique within a registry)
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A request to execute a tool. Produced by the completion provider,
/// never by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Opaque correlation token (matches the backend's tool_call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of one tool invocation. Immutable once created; every
/// invocation is answered by exactly one result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The invocation this result answers
    pub invocation_id: String,

    /// JSON-serializable output (or error message)
    pub content: serde_json::Value,

    /// Whether the invocation failed
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result.
    pub fn ok(invocation_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content,
            is_error: false,
        }
    }

    /// A failed result carrying the error message as content.
    pub fn error(invocation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: serde_json::Value::String(message.into()),
            is_error: true,
        }
    }
}

/// The core Tool trait.
///
/// Each tool is a pure function from JSON arguments to a JSON-serializable
/// result or error. Side effects (sending messages, writing files) live
/// entirely inside individual handlers and are opaque to the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// This tool's schema for inclusion in a completion request.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Backed by a `BTreeMap` so `schemas()` is deterministically ordered:
/// calling it twice without mutating the registry yields identical lists.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool schemas, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Execute one invocation. Unknown names fail with [`ToolError::Unknown`];
    /// handler errors never propagate — they are wrapped into an error result.
    /// Each invocation is attempted exactly once.
    pub async fn invoke(
        &self,
        invocation: &ToolInvocation,
    ) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&invocation.name)
            .ok_or_else(|| ToolError::Unknown(invocation.name.clone()))?;

        match tool.execute(invocation.arguments.clone()).await {
            Ok(content) => Ok(ToolResult::ok(&invocation.id, content)),
            Err(e) => {
                warn!(tool = %invocation.name, error = %e, "Tool handler failed");
                Ok(ToolResult::error(&invocation.id, e.to_string()))
            }
        }
    }

    /// Build a narrower registry containing only the named tools.
    /// Names absent from this registry are skipped.
    pub fn subset(&self, names: &[String]) -> ToolRegistry {
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| names.contains(name))
            .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
            .collect();
        ToolRegistry { tools }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
