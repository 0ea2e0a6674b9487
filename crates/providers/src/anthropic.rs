//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//!
//! The response's content blocks are folded into the core `Outcome`
//! contract: any `tool_use` block makes the round a `ToolRequest`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use switchboard_core::error::ProviderError;
use switchboard_core::message::{Message, Role};
use switchboard_core::provider::{CompletionProvider, CompletionRequest, Outcome};
use switchboard_core::tool::{ToolInvocation, ToolSchema};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Use a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert messages to Anthropic API format with content blocks.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        let mut result = Vec::new();

        for msg in messages {
            match msg.role {
                Role::User => {
                    result.push(ApiMessage {
                        role: "user",
                        content: ApiContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant => {
                    if msg.tool_calls.is_empty() {
                        result.push(ApiMessage {
                            role: "assistant",
                            content: ApiContent::Text(msg.content.clone()),
                        });
                    } else {
                        let mut blocks: Vec<ContentBlock> = Vec::new();
                        if !msg.content.is_empty() {
                            blocks.push(ContentBlock::Text {
                                text: msg.content.clone(),
                            });
                        }
                        for call in &msg.tool_calls {
                            blocks.push(ContentBlock::ToolUse {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                input: call.arguments.clone(),
                            });
                        }
                        result.push(ApiMessage {
                            role: "assistant",
                            content: ApiContent::Blocks(blocks),
                        });
                    }
                }
                Role::ToolResults => {
                    // One user message carrying every result of the round.
                    let blocks = msg
                        .tool_results
                        .iter()
                        .map(|r| ContentBlock::ToolResult {
                            tool_use_id: r.invocation_id.clone(),
                            content: r.content.to_string(),
                            is_error: r.is_error,
                        })
                        .collect();
                    result.push(ApiMessage {
                        role: "user",
                        content: ApiContent::Blocks(blocks),
                    });
                }
            }
        }

        result
    }

    /// Convert tool schemas to Anthropic format.
    fn to_api_tools(tools: &[ToolSchema]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    /// Fold the response's content blocks into an Outcome.
    fn to_outcome(body: &serde_json::Value) -> Result<Outcome, ProviderError> {
        let blocks = body["content"].as_array().ok_or_else(|| {
            ProviderError::MalformedResponse("missing 'content' array".into())
        })?;

        let mut text_parts: Vec<&str> = Vec::new();
        let mut invocations: Vec<ToolInvocation> = Vec::new();

        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        text_parts.push(text);
                    }
                }
                Some("tool_use") => {
                    invocations.push(ToolInvocation {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        arguments: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        let text = text_parts.join("\n");
        if invocations.is_empty() {
            Ok(Outcome::FinalAnswer { text })
        } else {
            Ok(Outcome::ToolRequest {
                invocations,
                partial_text: text,
            })
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Outcome, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let api_messages = Self::to_api_messages(&request.messages);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": api_messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
        });

        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::json!(request.system_prompt);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = "anthropic", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Self::to_outcome(&api_resp)
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchboard_core::tool::ToolResult;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test")
            .unwrap()
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn tool_results_become_one_user_message() {
        let messages = vec![Message::tool_results(vec![
            ToolResult::ok("call_1", json!({"value": 42})),
            ToolResult::error("call_2", "boom"),
        ])];

        let api = AnthropicProvider::to_api_messages(&messages);
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].role, "user");
        let encoded = serde_json::to_value(&api[0]).unwrap();
        let blocks = encoded["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "tool_result");
        assert_eq!(blocks[0]["tool_use_id"], "call_1");
        assert_eq!(blocks[1]["is_error"], true);
    }

    #[test]
    fn assistant_tool_calls_become_tool_use_blocks() {
        let messages = vec![Message::assistant_with_calls(
            "Let me check.",
            vec![ToolInvocation {
                id: "call_1".into(),
                name: "web_search".into(),
                arguments: json!({"query": "rust"}),
            }],
        )];

        let api = AnthropicProvider::to_api_messages(&messages);
        let encoded = serde_json::to_value(&api[0]).unwrap();
        let blocks = encoded["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["name"], "web_search");
        assert_eq!(blocks[1]["input"]["query"], "rust");
    }

    #[test]
    fn text_only_response_is_final_answer() {
        let body = json!({
            "content": [{"type": "text", "text": "The answer is 4."}],
            "stop_reason": "end_turn"
        });
        let outcome = AnthropicProvider::to_outcome(&body).unwrap();
        assert!(matches!(outcome, Outcome::FinalAnswer { text } if text == "The answer is 4."));
    }

    #[test]
    fn tool_use_response_is_tool_request() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Looking that up."},
                {"type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {"query": "x"}}
            ],
            "stop_reason": "tool_use"
        });
        let outcome = AnthropicProvider::to_outcome(&body).unwrap();
        match outcome {
            Outcome::ToolRequest {
                invocations,
                partial_text,
            } => {
                assert_eq!(invocations.len(), 1);
                assert_eq!(invocations[0].id, "toolu_1");
                assert_eq!(invocations[0].name, "lookup");
                assert_eq!(partial_text, "Looking that up.");
            }
            _ => panic!("Expected ToolRequest"),
        }
    }

    #[test]
    fn missing_content_is_malformed() {
        let body = json!({"stop_reason": "end_turn"});
        let err = AnthropicProvider::to_outcome(&body).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
