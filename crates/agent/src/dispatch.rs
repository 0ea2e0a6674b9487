//! The dispatch loop: bounded oscillation between completion and tool
//! execution.
//!
//! One `run()` drives a single turn for one session: call the provider,
//! execute any requested tools, feed the results back, repeat until the
//! provider produces a final answer or the iteration budget runs out.
//! The loop never hangs and never fails opaquely on a runaway model;
//! exhaustion surfaces as an explicit flag on the outcome.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use switchboard_core::error::{Error, Result};
use switchboard_core::event::{EventBus, OrchestratorEvent};
use switchboard_core::message::{Message, SessionId};
use switchboard_core::provider::{CompletionProvider, CompletionRequest, Outcome};
use switchboard_core::tool::{ToolInvocation, ToolRegistry, ToolResult};
use switchboard_session::SessionStore;

/// What one turn of the dispatch loop produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The final (or last partial) text of the turn
    pub text: String,

    /// How many provider round-trips the turn took
    pub rounds: u32,

    /// Whether the iteration budget ran out before a final answer
    pub budget_exhausted: bool,
}

/// The dispatch loop for one agent tier (primary or specialist).
///
/// Holds everything a turn needs except the conversation itself, which
/// lives in the [`SessionStore`] so the loop stays stateless across turns.
pub struct DispatchLoop {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_rounds: u32,
    events: Arc<EventBus>,
}

impl DispatchLoop {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            system_prompt: system_prompt.into(),
            model: "claude-sonnet-4-5".into(),
            temperature: 0.7,
            max_tokens: None,
            max_rounds: 5,
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Run one turn over the given session.
    ///
    /// The caller is expected to have appended the user message already;
    /// on success the session additionally holds the assistant messages
    /// and tool-result messages this turn produced. A provider failure
    /// abandons the round: the error propagates and no assistant message
    /// is appended, so the user message stays persisted for a retry.
    pub async fn run(
        &self,
        store: &SessionStore,
        session_id: &SessionId,
    ) -> Result<DispatchOutcome> {
        let mut last_partial = String::new();

        for round in 1..=self.max_rounds {
            let request = CompletionRequest {
                model: self.model.clone(),
                system_prompt: self.system_prompt.clone(),
                messages: store.history(session_id).await,
                tools: self.registry.schemas(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let outcome = match self.provider.complete(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.events.publish(OrchestratorEvent::ProviderFailed {
                        provider: self.provider.name().to_string(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(Error::Provider(e));
                }
            };

            match outcome {
                Outcome::FinalAnswer { text } => {
                    store.append(session_id, Message::assistant(&text)).await;
                    self.events.publish(OrchestratorEvent::RoundCompleted {
                        session_id: session_id.to_string(),
                        round,
                        tool_invocations: 0,
                        timestamp: Utc::now(),
                    });
                    debug!(session_id = %session_id, round, "Turn finished");
                    return Ok(DispatchOutcome {
                        text,
                        rounds: round,
                        budget_exhausted: false,
                    });
                }
                Outcome::ToolRequest {
                    invocations,
                    partial_text,
                } => {
                    store
                        .append(
                            session_id,
                            Message::assistant_with_calls(&partial_text, invocations.clone()),
                        )
                        .await;
                    last_partial = partial_text;

                    let results = self.execute_all(&invocations).await;
                    store.append(session_id, Message::tool_results(results)).await;

                    self.events.publish(OrchestratorEvent::RoundCompleted {
                        session_id: session_id.to_string(),
                        round,
                        tool_invocations: invocations.len(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        warn!(
            session_id = %session_id,
            max_rounds = self.max_rounds,
            "Iteration budget exhausted before a final answer"
        );
        let text = if last_partial.is_empty() {
            "Reached the tool budget for this request without a final answer.".to_string()
        } else {
            last_partial
        };
        Ok(DispatchOutcome {
            text,
            rounds: self.max_rounds,
            budget_exhausted: true,
        })
    }

    /// Execute all invocations of one round concurrently.
    ///
    /// Result order follows invocation order regardless of completion
    /// order; callers correlate by invocation id. Unknown tool names
    /// become error results so the conversation continues.
    async fn execute_all(&self, invocations: &[ToolInvocation]) -> Vec<ToolResult> {
        let futures = invocations.iter().map(|invocation| async move {
            let start = Instant::now();
            let result = match self.registry.invoke(invocation).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(&invocation.id, e.to_string()),
            };
            self.events.publish(OrchestratorEvent::ToolInvoked {
                tool_name: invocation.name.clone(),
                ok: !result.is_error,
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
            result
        });
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider, StaticTool};
    use serde_json::json;

    fn registry_with_calculator() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::new("calculator", json!({"result": 42}))))
            .unwrap();
        Arc::new(registry)
    }

    fn tool_request(name: &str) -> Outcome {
        Outcome::ToolRequest {
            invocations: vec![ToolInvocation {
                id: "call_1".into(),
                name: name.into(),
                arguments: json!({}),
            }],
            partial_text: "Let me check.".into(),
        }
    }

    #[tokio::test]
    async fn final_answer_on_first_round() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Outcome::FinalAnswer {
            text: "Paris".into(),
        }]));
        let dispatch = DispatchLoop::new(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            "You are helpful.",
        );
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("Capital of France?")).await;

        let outcome = dispatch.run(&store, &id).await.unwrap();
        assert_eq!(outcome.text, "Paris");
        assert_eq!(outcome.rounds, 1);
        assert!(!outcome.budget_exhausted);
        assert_eq!(provider.call_count(), 1);

        // History: user question plus one assistant answer.
        let history = store.history(&id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Paris");
    }

    #[tokio::test]
    async fn single_tool_round() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_request("calculator"),
            Outcome::FinalAnswer { text: "42".into() },
        ]));
        let dispatch = DispatchLoop::new(provider.clone(), registry_with_calculator(), "calc");
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("What is 6 * 7?")).await;

        let outcome = dispatch.run(&store, &id).await.unwrap();
        assert_eq!(outcome.text, "42");
        assert_eq!(outcome.rounds, 2);
        assert_eq!(provider.call_count(), 2);

        // user, assistant-with-calls, one tool-results message, assistant.
        let history = store.history(&id).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[1].tool_calls.len(), 1);
        assert_eq!(history[2].tool_results.len(), 1);
        assert_eq!(history[2].tool_results[0].invocation_id, "call_1");
        assert!(!history[2].tool_results[0].is_error);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_request("nonexistent"),
            Outcome::FinalAnswer {
                text: "I could not use that tool.".into(),
            },
        ]));
        let dispatch = DispatchLoop::new(provider.clone(), Arc::new(ToolRegistry::new()), "x");
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("go")).await;

        let outcome = dispatch.run(&store, &id).await.unwrap();
        assert!(!outcome.budget_exhausted);
        assert_eq!(provider.call_count(), 2);

        let history = store.history(&id).await;
        let result = &history[2].tool_results[0];
        assert!(result.is_error);
        assert!(result.content.to_string().contains("nonexistent"));
    }

    #[tokio::test]
    async fn budget_exhaustion_is_flagged() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_request("calculator"),
            tool_request("calculator"),
            tool_request("calculator"),
        ]));
        let dispatch = DispatchLoop::new(provider.clone(), registry_with_calculator(), "x")
            .with_max_rounds(3);
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("loop forever")).await;

        let outcome = dispatch.run(&store, &id).await.unwrap();
        assert!(outcome.budget_exhausted);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.text, "Let me check.");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn provider_error_leaves_no_assistant_message() {
        let provider = Arc::new(FailingProvider);
        let dispatch = DispatchLoop::new(provider, Arc::new(ToolRegistry::new()), "x");
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("hello")).await;

        let err = dispatch.run(&store, &id).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        // The user message stays persisted for a retry.
        let history = store.history(&id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn parallel_results_follow_invocation_order() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::new("alpha", json!("a"))))
            .unwrap();
        registry
            .register(Arc::new(StaticTool::new("beta", json!("b"))))
            .unwrap();

        let provider = Arc::new(SequentialMockProvider::new(vec![
            Outcome::ToolRequest {
                invocations: vec![
                    ToolInvocation {
                        id: "call_b".into(),
                        name: "beta".into(),
                        arguments: json!({}),
                    },
                    ToolInvocation {
                        id: "call_a".into(),
                        name: "alpha".into(),
                        arguments: json!({}),
                    },
                ],
                partial_text: String::new(),
            },
            Outcome::FinalAnswer { text: "done".into() },
        ]));
        let dispatch = DispatchLoop::new(provider, Arc::new(registry), "x");
        let store = SessionStore::new(100);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("both")).await;

        dispatch.run(&store, &id).await.unwrap();
        let history = store.history(&id).await;
        let results = &history[2].tool_results;
        assert_eq!(results[0].invocation_id, "call_b");
        assert_eq!(results[1].invocation_id, "call_a");
    }
}
