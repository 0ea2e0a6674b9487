//! OpenAI-compatible provider implementation.
//!
//! Works with any backend speaking the `/v1/chat/completions` dialect
//! (OpenAI, Moonshot/Kimi, OpenRouter, local servers):
//! - Bearer token authentication
//! - System prompt as the first message
//! - Tool calls as a `tool_calls` array with stringified JSON arguments
//! - Tool results as individual `tool` role messages

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use switchboard_core::error::ProviderError;
use switchboard_core::message::{Message, Role};
use switchboard_core::provider::{CompletionProvider, CompletionRequest, Outcome};
use switchboard_core::tool::{ToolInvocation, ToolSchema};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI-compatible chat completion APIs.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        Ok(Self {
            name: "openai_compat".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Point at a different compatible backend (e.g., Moonshot, OpenRouter).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the provider's display name (useful when several
    /// compatible backends are configured side by side).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Convert the message sequence to the chat-completions format.
    /// A tool-results message expands into one `tool` message per result.
    fn to_api_messages(system_prompt: &str, messages: &[Message]) -> Vec<serde_json::Value> {
        let mut result = Vec::new();

        if !system_prompt.is_empty() {
            result.push(serde_json::json!({
                "role": "system",
                "content": system_prompt,
            }));
        }

        for msg in messages {
            match msg.role {
                Role::User => {
                    result.push(serde_json::json!({
                        "role": "user",
                        "content": msg.content,
                    }));
                }
                Role::Assistant => {
                    let mut api_msg = serde_json::json!({
                        "role": "assistant",
                        "content": msg.content,
                    });
                    if !msg.tool_calls.is_empty() {
                        let calls: Vec<serde_json::Value> = msg
                            .tool_calls
                            .iter()
                            .map(|call| {
                                serde_json::json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string(),
                                    },
                                })
                            })
                            .collect();
                        api_msg["tool_calls"] = serde_json::Value::Array(calls);
                    }
                    result.push(api_msg);
                }
                Role::ToolResults => {
                    for tool_result in &msg.tool_results {
                        result.push(serde_json::json!({
                            "role": "tool",
                            "tool_call_id": tool_result.invocation_id,
                            "content": tool_result.content.to_string(),
                        }));
                    }
                }
            }
        }

        result
    }

    fn to_api_tools(tools: &[ToolSchema]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                kind: "function",
                function: ApiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Fold the first choice's message into an Outcome.
    fn to_outcome(body: &serde_json::Value) -> Result<Outcome, ProviderError> {
        let message = body["choices"]
            .get(0)
            .map(|c| &c["message"])
            .ok_or_else(|| ProviderError::MalformedResponse("missing 'choices'".into()))?;

        let text = message["content"].as_str().unwrap_or_default().to_string();

        let invocations: Vec<ToolInvocation> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        // Arguments arrive as a JSON string; tolerate junk.
                        let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
                        let arguments =
                            serde_json::from_str(raw_args).unwrap_or(serde_json::json!({}));
                        ToolInvocation {
                            id: call["id"].as_str().unwrap_or_default().to_string(),
                            name: call["function"]["name"]
                                .as_str()
                                .unwrap_or_default()
                                .to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

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
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Outcome, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let api_messages = Self::to_api_messages(&request.system_prompt, &request.messages);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": api_messages,
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
            return Err(ProviderError::AuthenticationFailed(format!(
                "Invalid API key for {}",
                self.name
            )));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat completions API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse response: {e}"))
        })?;

        Self::to_outcome(&api_resp)
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}
