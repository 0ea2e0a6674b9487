//! Test doubles for exercising the dispatch loop and router without a
//! live backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use switchboard_core::error::{ProviderError, ToolError};
use switchboard_core::provider::{CompletionProvider, CompletionRequest, Outcome};
use switchboard_core::tool::Tool;

/// A provider that replays a fixed script of outcomes, one per call.
///
/// Running past the end of the script is a test bug and surfaces as a
/// `MalformedResponse` error naming the call number.
pub struct SequentialMockProvider {
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
}

impl SequentialMockProvider {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `complete` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for SequentialMockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> std::result::Result<Outcome, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let next = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };
        next.ok_or_else(|| {
            ProviderError::MalformedResponse(format!("mock script exhausted at call {call}"))
        })
    }
}

/// A provider whose every call fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> std::result::Result<Outcome, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A tool that ignores its arguments and returns a fixed value.
pub struct StaticTool {
    name: String,
    output: serde_json::Value,
}

impl StaticTool {
    pub fn new(name: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed value."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        Ok(self.output.clone())
    }
}
