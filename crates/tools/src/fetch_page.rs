//! Fetch page tool — GET a URL and return its text content, truncated.

use async_trait::async_trait;

use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

const MAX_CONTENT_CHARS: usize = 5000;

pub struct FetchPageTool {
    client: reqwest::Client,
}

impl FetchPageTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("switchboard/0.1")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for FetchPageTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Fetch a web page by URL and return its text content (truncated to 5000 characters)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch (http or https)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(format!(
                "URL must be http or https: {url}"
            )));
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "fetch_page".into(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "fetch_page".into(),
                reason: e.to_string(),
            })?;

        let total_length = body.len();
        let content: String = body.chars().take(MAX_CONTENT_CHARS).collect();

        Ok(serde_json::json!({
            "url": url,
            "status": status,
            "content": content,
            "length": total_length,
            "truncated": total_length > MAX_CONTENT_CHARS,
        }))
    }
}
