//! File write tool.

use async_trait::async_trait;

use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

use crate::file_read::check_path;

pub struct FileWriteTool;

impl FileWriteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        check_path("file_write", path)?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::ExecutionFailed {
                        tool_name: "file_write".into(),
                        reason: format!("Failed to create directories for {path}: {e}"),
                    }
                })?;
            }
        }

        tokio::fs::write(path, content).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "file_write".into(),
                reason: format!("Failed to write {path}: {e}"),
            }
        })?;

        Ok(serde_json::json!({
            "path": path,
            "bytes_written": content.len(),
        }))
    }
}
