//! CompletionProvider trait — the abstraction over LLM backends.
//!
//! A provider knows how to send a system prompt, a tool schema list, and an
//! ordered message sequence to an LLM and report back either a final textual
//! answer or a set of requested tool invocations. Adapting a backend's
//! native tool-call wire format into this contract is the provider's
//! responsibility, not the dispatch loop's.
//!
//! Implementations: Anthropic-native, OpenAI-compatible, scripted mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolInvocation, ToolSchema};

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "claude-sonnet-4-5")
    pub model: String,

    /// System prompt for this tier (primary or specialist)
    pub system_prompt: String,

    /// The ordered message sequence
    pub messages: Vec<Message>,

    /// Schemas of the tools the model may request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// What the provider produced for one completion round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    /// The model answered with text only; the round is over.
    FinalAnswer { text: String },

    /// The model requested tool invocations, possibly alongside partial text.
    ToolRequest {
        invocations: Vec<ToolInvocation>,
        partial_text: String,
    },
}

impl Outcome {
    /// The textual content of this outcome, partial or final.
    pub fn text(&self) -> &str {
        match self {
            Outcome::FinalAnswer { text } => text,
            Outcome::ToolRequest { partial_text, .. } => partial_text,
        }
    }
}

/// The core CompletionProvider trait.
///
/// The dispatch loop calls `complete()` without knowing which backend is
/// being used — providers are interchangeable behind this contract, and
/// the primary and specialist tiers may use different concrete backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get back this round's outcome.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<Outcome, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_text_covers_both_variants() {
        let final_answer = Outcome::FinalAnswer {
            text: "done".into(),
        };
        assert_eq!(final_answer.text(), "done");

        let tool_request = Outcome::ToolRequest {
            invocations: vec![ToolInvocation {
                id: "call_1".into(),
                name: "web_search".into(),
                arguments: json!({"query": "x"}),
            }],
            partial_text: "checking".into(),
        };
        assert_eq!(tool_request.text(), "checking");
    }

    #[test]
    fn tool_schema_serialization() {
        let schema = ToolSchema {
            name: "web_search".into(),
            description: "Search the web".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query" }
                },
                "required": ["query"]
            }),
        };
        let encoded = serde_json::to_string(&schema).unwrap();
        assert!(encoded.contains("web_search"));
        assert!(encoded.contains("query"));
    }

    #[test]
    fn completion_request_defaults() {
        let req = CompletionRequest {
            model: "claude-sonnet-4-5".into(),
            system_prompt: "You are helpful.".into(),
            messages: vec![],
            tools: vec![],
            temperature: default_temperature(),
            max_tokens: None,
        };
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }
}
