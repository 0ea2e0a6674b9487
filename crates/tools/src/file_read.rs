//! File read tool — read file contents with sensitive-path checks.

use async_trait::async_trait;

use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

/// Path prefixes that are never readable or writable by tools.
pub(crate) const FORBIDDEN_PREFIXES: &[&str] = &[
    "/etc/shadow",
    "/etc/passwd",
    "/etc/sudoers",
    "/root/.ssh",
];

pub(crate) fn check_path(tool_name: &str, path: &str) -> Result<(), ToolError> {
    let forbidden = FORBIDDEN_PREFIXES.iter().any(|p| path.starts_with(p))
        || path.contains("/.ssh/")
        || path.ends_with("/.ssh");
    if forbidden {
        return Err(ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: format!("Access to sensitive path denied: {path}"),
        });
    }
    Ok(())
}

pub struct FileReadTool;

impl FileReadTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        check_path("file_read", path)?;

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "file_read".into(),
                reason: format!("Failed to read {path}: {e}"),
            }
        })?;

        Ok(serde_json::json!({
            "path": path,
            "content": content,
            "length": content.len(),
        }))
    }
}
