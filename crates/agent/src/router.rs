//! The delegation router, the orchestrator behind `process_turn`.
//!
//! A turn goes to the primary agent first. If its final answer carries a
//! delegation marker, the named specialist runs the task over its own
//! session and the primary synthesizes the specialist's answer into the
//! reply. At most one delegation hop per turn; the synthesis output is
//! never re-parsed for markers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use switchboard_config::AppConfig;
use switchboard_core::error::Result;
use switchboard_core::event::{EventBus, OrchestratorEvent};
use switchboard_core::message::{Message, SessionId};
use switchboard_core::provider::CompletionProvider;
use switchboard_core::tool::ToolRegistry;
use switchboard_session::SessionStore;

use crate::catalog::{self, SpecialistDef};
use crate::delegation::{self, DelegationRequest};
use crate::dispatch::DispatchLoop;

/// The outcome of one `process_turn`.
#[derive(Debug, Clone)]
pub struct TurnResponse {
    /// The reply to show the user
    pub reply: String,

    /// Which specialist handled the turn, if any
    pub specialist_used: Option<String>,

    /// Whether the turn was delegated
    pub delegated: bool,

    /// Whether any dispatch loop in the turn ran out of budget
    pub budget_exhausted: bool,
}

/// A point-in-time view of the orchestrator's state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub sessions: Vec<SessionStatus>,
    pub active_specialists: Vec<String>,
    pub available_specialists: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub id: String,
    pub messages: usize,
}

struct SpecialistEntry {
    dispatch: DispatchLoop,
    session_id: SessionId,
}

/// The orchestrator: owns the primary dispatch loop, the specialist
/// cache, and the shared session store.
pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    store: Arc<SessionStore>,
    config: AppConfig,
    events: Arc<EventBus>,
    specialists: Mutex<HashMap<(SessionId, String), Arc<SpecialistEntry>>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<ToolRegistry>,
        store: Arc<SessionStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            store,
            config,
            events: Arc::new(EventBus::default()),
            specialists: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// The event bus this orchestrator publishes to.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn primary_loop(&self) -> DispatchLoop {
        DispatchLoop::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
            catalog::primary_system_prompt(),
        )
        .with_model(&self.config.default_model)
        .with_temperature(self.config.default_temperature)
        .with_max_tokens(self.config.default_max_tokens)
        .with_max_rounds(self.config.dispatch.max_tool_rounds)
        .with_events(Arc::clone(&self.events))
    }

    /// Process one user turn for a session.
    ///
    /// The user message is persisted before anything else, so a provider
    /// failure later in the turn never loses it. Provider failures
    /// propagate; tool failures and delegation mishaps are absorbed into
    /// the reply.
    pub async fn process_turn(
        &self,
        session_id: &SessionId,
        user_text: impl Into<String>,
    ) -> Result<TurnResponse> {
        self.store
            .append(session_id, Message::user(user_text.into()))
            .await;

        let primary = self.primary_loop();
        let outcome = primary.run(&self.store, session_id).await?;

        if outcome.budget_exhausted {
            return Ok(TurnResponse {
                reply: outcome.text,
                specialist_used: None,
                delegated: false,
                budget_exhausted: true,
            });
        }

        let request = match delegation::parse_delegation(&outcome.text) {
            Some(request) => request,
            None => {
                if delegation::looks_like_marker(&outcome.text) {
                    debug!(session_id = %session_id, "Delegation-like reply failed to parse");
                }
                return Ok(TurnResponse {
                    reply: outcome.text,
                    specialist_used: None,
                    delegated: false,
                    budget_exhausted: false,
                });
            }
        };

        self.delegate(session_id, request, outcome.text).await
    }

    async fn delegate(
        &self,
        session_id: &SessionId,
        request: DelegationRequest,
        primary_text: String,
    ) -> Result<TurnResponse> {
        // An unknown specialist type skips delegation entirely: the
        // primary's answer goes back unchanged, never an error.
        let Some(def) = catalog::find(&request.specialist) else {
            warn!(specialist = %request.specialist, "Unknown specialist requested");
            return Ok(TurnResponse {
                reply: primary_text,
                specialist_used: None,
                delegated: false,
                budget_exhausted: false,
            });
        };

        info!(
            session_id = %session_id,
            specialist = def.name,
            "Delegating turn to specialist"
        );
        self.events.publish(OrchestratorEvent::DelegationRouted {
            session_id: session_id.to_string(),
            specialist: def.name.to_string(),
            timestamp: Utc::now(),
        });

        let entry = self.specialist_entry(session_id, def).await;
        self.store
            .append(&entry.session_id, Message::user(&request.task))
            .await;

        let specialist_outcome = match entry.dispatch.run(&self.store, &entry.session_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(specialist = def.name, error = %e, "Specialist dispatch failed");
                return Ok(TurnResponse {
                    reply: format!(
                        "The {} specialist could not complete the task: {e}",
                        def.name
                    ),
                    specialist_used: None,
                    delegated: false,
                    budget_exhausted: false,
                });
            }
        };

        // Feed the specialist's answer back for one synthesis pass. Its
        // output is final: markers in it are not honored.
        let synthesis = format!(
            "The {} specialist completed this task:\n\n\
             Task: {}\n\n\
             Specialist's response:\n{}\n\n\
             Synthesize this into a clear final answer for the user.",
            def.name, request.task, specialist_outcome.text
        );
        self.store
            .append(session_id, Message::user(synthesis))
            .await;

        let primary = self.primary_loop();
        let final_outcome = primary.run(&self.store, session_id).await?;

        Ok(TurnResponse {
            reply: final_outcome.text,
            specialist_used: Some(def.name.to_string()),
            delegated: true,
            budget_exhausted: specialist_outcome.budget_exhausted
                || final_outcome.budget_exhausted,
        })
    }

    /// Get or create the cached specialist for this (session, type) pair.
    async fn specialist_entry(
        &self,
        session_id: &SessionId,
        def: &'static SpecialistDef,
    ) -> Arc<SpecialistEntry> {
        let key = (session_id.clone(), def.name.to_string());
        let mut specialists = self.specialists.lock().await;
        if let Some(entry) = specialists.get(&key) {
            return Arc::clone(entry);
        }

        let tool_names: Vec<String> = def.tools.iter().map(|t| t.to_string()).collect();
        let registry = Arc::new(self.registry.subset(&tool_names));
        let model = self
            .config
            .specialists
            .get(def.name)
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| self.config.default_model.clone());

        let dispatch = DispatchLoop::new(Arc::clone(&self.provider), registry, def.system_prompt)
            .with_model(model)
            .with_temperature(self.config.default_temperature)
            .with_max_tokens(self.config.default_max_tokens)
            .with_max_rounds(self.config.max_rounds_for(def.name))
            .with_events(Arc::clone(&self.events));

        let entry = Arc::new(SpecialistEntry {
            dispatch,
            session_id: SessionId::from(&format!("{session_id}::{}", def.name)),
        });
        specialists.insert(key, Arc::clone(&entry));
        entry
    }

    /// Destroy a session: the primary history and any cached specialists
    /// (and their sessions) for it. Returns whether the primary existed.
    pub async fn reset(&self, session_id: &SessionId) -> bool {
        let existed = self.store.reset(session_id).await;

        let mut specialists = self.specialists.lock().await;
        let stale: Vec<(SessionId, String)> = specialists
            .keys()
            .filter(|(id, _)| id == session_id)
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = specialists.remove(&key) {
                self.store.reset(&entry.session_id).await;
            }
        }
        existed
    }

    /// Report live sessions and specialist activity.
    pub async fn status(&self) -> StatusReport {
        let mut sessions = Vec::new();
        for id in self.store.session_ids().await {
            let messages = self.store.len(&id).await;
            sessions.push(SessionStatus {
                id: id.to_string(),
                messages,
            });
        }
        sessions.sort_by(|a, b| a.id.cmp(&b.id));

        let specialists = self.specialists.lock().await;
        let mut active: Vec<String> = specialists
            .keys()
            .map(|(id, name)| format!("{id}:{name}"))
            .collect();
        active.sort();

        StatusReport {
            sessions,
            active_specialists: active,
            available_specialists: catalog::names().iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, StaticTool};
    use serde_json::json;
    use switchboard_core::provider::Outcome;
    use switchboard_core::tool::ToolInvocation;

    fn orchestrator_with(script: Vec<Outcome>) -> (Orchestrator, Arc<SequentialMockProvider>) {
        let provider = Arc::new(SequentialMockProvider::new(script));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::new(
                "web_search",
                json!({"results": ["found it"]}),
            )))
            .unwrap();
        let orchestrator = Orchestrator::new(
            provider.clone(),
            Arc::new(registry),
            Arc::new(SessionStore::new(100)),
            AppConfig::default(),
        );
        (orchestrator, provider)
    }

    fn delegation_marker(specialist: &str, task: &str) -> Outcome {
        Outcome::FinalAnswer {
            text: format!(
                "{{\"action\": \"delegate\", \"specialist\": \"{specialist}\", \"task\": \"{task}\"}}"
            ),
        }
    }

    #[tokio::test]
    async fn plain_answer_is_not_delegated() {
        let (orchestrator, provider) = orchestrator_with(vec![Outcome::FinalAnswer {
            text: "Paris".into(),
        }]);
        let id = SessionId::from("user-1");

        let response = orchestrator
            .process_turn(&id, "Capital of France?")
            .await
            .unwrap();
        assert_eq!(response.reply, "Paris");
        assert!(!response.delegated);
        assert!(response.specialist_used.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn delegation_runs_specialist_and_synthesizes() {
        let (orchestrator, provider) = orchestrator_with(vec![
            delegation_marker("research", "Find rust adoption statistics"),
            Outcome::FinalAnswer {
                text: "Rust adoption grew 30% year over year.".into(),
            },
            Outcome::FinalAnswer {
                text: "Research shows Rust adoption grew 30% in the last year.".into(),
            },
        ]);
        let id = SessionId::from("user-1");

        let response = orchestrator
            .process_turn(&id, "How fast is Rust growing?")
            .await
            .unwrap();
        assert!(response.delegated);
        assert_eq!(response.specialist_used.as_deref(), Some("research"));
        assert!(response.reply.contains("30%"));
        assert!(!response.budget_exhausted);
        // Primary, specialist, synthesis.
        assert_eq!(provider.call_count(), 3);

        // The specialist session was seeded with exactly the task text.
        let specialist_id = SessionId::from("user-1::research");
        let history = orchestrator.store.history(&specialist_id).await;
        assert_eq!(history[0].content, "Find rust adoption statistics");
    }

    #[tokio::test]
    async fn unknown_specialist_returns_answer_unchanged() {
        let (orchestrator, provider) =
            orchestrator_with(vec![delegation_marker("astrology", "Read my chart")]);
        let id = SessionId::from("user-1");

        let response = orchestrator.process_turn(&id, "help").await.unwrap();
        assert!(!response.delegated);
        assert!(response.specialist_used.is_none());
        // The primary's answer comes back unmodified.
        assert!(response.reply.contains("\"astrology\""));
        // No specialist or synthesis call happened.
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn specialist_tool_use_within_delegation() {
        let (orchestrator, provider) = orchestrator_with(vec![
            delegation_marker("research", "Look up crab facts"),
            Outcome::ToolRequest {
                invocations: vec![ToolInvocation {
                    id: "call_1".into(),
                    name: "web_search".into(),
                    arguments: json!({"query": "crab facts"}),
                }],
                partial_text: String::new(),
            },
            Outcome::FinalAnswer {
                text: "Crabs walk sideways.".into(),
            },
            Outcome::FinalAnswer {
                text: "Here's what the research found: crabs walk sideways.".into(),
            },
        ]);
        let id = SessionId::from("user-1");

        let response = orchestrator.process_turn(&id, "crab facts?").await.unwrap();
        assert!(response.delegated);
        assert_eq!(provider.call_count(), 4);
        assert!(response.reply.contains("sideways"));
    }

    #[tokio::test]
    async fn synthesis_markers_are_not_rehonored() {
        let (orchestrator, provider) = orchestrator_with(vec![
            delegation_marker("research", "task one"),
            Outcome::FinalAnswer {
                text: "specialist answer".into(),
            },
            // Synthesis output containing a marker must be returned verbatim.
            delegation_marker("seo", "task two"),
        ]);
        let id = SessionId::from("user-1");

        let response = orchestrator.process_turn(&id, "go").await.unwrap();
        assert!(response.delegated);
        assert_eq!(response.specialist_used.as_deref(), Some("research"));
        assert!(response.reply.contains("seo"));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn reset_clears_primary_and_specialist_sessions() {
        let (orchestrator, _provider) = orchestrator_with(vec![
            delegation_marker("research", "a task"),
            Outcome::FinalAnswer {
                text: "done".into(),
            },
            Outcome::FinalAnswer {
                text: "all done".into(),
            },
        ]);
        let id = SessionId::from("user-1");
        orchestrator.process_turn(&id, "go").await.unwrap();

        let specialist_id = SessionId::from("user-1::research");
        assert!(orchestrator.store.len(&specialist_id).await > 0);

        assert!(orchestrator.reset(&id).await);
        assert_eq!(orchestrator.store.len(&id).await, 0);
        assert_eq!(orchestrator.store.len(&specialist_id).await, 0);

        let status = orchestrator.status().await;
        assert!(status.active_specialists.is_empty());
    }

    #[tokio::test]
    async fn status_reports_catalog_and_activity() {
        let (orchestrator, _provider) = orchestrator_with(vec![
            delegation_marker("seo", "audit the site"),
            Outcome::FinalAnswer {
                text: "audit done".into(),
            },
            Outcome::FinalAnswer {
                text: "summary".into(),
            },
        ]);
        let id = SessionId::from("user-1");
        orchestrator.process_turn(&id, "go").await.unwrap();

        let status = orchestrator.status().await;
        assert_eq!(status.active_specialists, vec!["user-1:seo"]);
        assert!(status
            .available_specialists
            .contains(&"web_development".to_string()));
        assert!(status.sessions.iter().any(|s| s.id == "user-1"));
        assert!(status.sessions.iter().any(|s| s.id == "user-1::seo"));
    }

    #[tokio::test]
    async fn budget_exhausted_primary_skips_delegation_parse() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Outcome::ToolRequest {
                invocations: vec![ToolInvocation {
                    id: "c1".into(),
                    name: "web_search".into(),
                    arguments: json!({}),
                }],
                partial_text: "still working".into(),
            };
            5
        ]));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::new("web_search", json!({}))))
            .unwrap();
        let orchestrator = Orchestrator::new(
            provider.clone(),
            Arc::new(registry),
            Arc::new(SessionStore::new(100)),
            AppConfig::default(),
        );
        let id = SessionId::from("user-1");

        let response = orchestrator.process_turn(&id, "go").await.unwrap();
        assert!(response.budget_exhausted);
        assert!(!response.delegated);
        assert_eq!(response.reply, "still working");
        assert_eq!(provider.call_count(), 5);
    }
}
