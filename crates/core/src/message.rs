//! Message and Session domain types.
//!
//! These are the core value objects that flow through the orchestrator:
//! User sends a message → Dispatch Loop processes it → Provider generates
//! either a final answer or tool requests → results are appended back.
//! A session's ordered message sequence is the sole conversational memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolInvocation, ToolResult};

/// Unique identifier for a session (one conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user
    User,
    /// The model's reply, possibly carrying tool-call metadata
    Assistant,
    /// The collected results of one tool-execution round
    ToolResults,
}

/// A single message in a session.
///
/// Ordering within a session is significant and append-only. A message with
/// role [`Role::ToolResults`] carries every result of one execution round,
/// so each round contributes exactly one tool-result message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool invocations requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Results answering a previous round's invocations (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message with text only.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message carrying tool-call metadata.
    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create the single tool-result message for one execution round.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::ToolResults,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_results: results,
            timestamp: Utc::now(),
        }
    }
}

/// A session is an ordered, append-only sequence of messages with bounded
/// retention, scoped to one conversation identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session with the given id.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the session.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Truncate to at most `max` messages, dropping the oldest first.
    /// Relative order of the retained messages is preserved.
    pub fn truncate_to(&mut self, max: usize) {
        if self.messages.len() > max {
            let excess = self.messages.len() - max;
            self.messages.drain(..excess);
        }
    }
}
