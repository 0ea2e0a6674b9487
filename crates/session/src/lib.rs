//! Session store — keyed conversation history with bounded retention.
//!
//! Sessions are created on first use, mutated append-only by dispatch
//! rounds, truncated oldest-first past the retention limit, and destroyed
//! by an explicit reset (or process restart — no persistence is promised).
//!
//! Mutation discipline is per-key: separate sessions are fully independent
//! and share nothing beyond the store's map lock, which is held only for
//! the duration of a single append or read.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use switchboard_core::message::{Message, Session, SessionId};

/// In-memory session store, injected into the orchestrator rather than
/// referenced as ambient global state.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    max_messages: usize,
}

impl SessionStore {
    /// Create a store retaining at most `max_messages` per session.
    pub fn new(max_messages: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
        }
    }

    /// Append one message, creating the session on first use.
    /// Truncates oldest-first once the retention limit is exceeded.
    pub async fn append(&self, id: &SessionId, message: Message) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session::new(id.clone()));
        session.push(message);
        session.truncate_to(self.max_messages);
    }

    /// Append several messages under one lock acquisition.
    pub async fn extend(&self, id: &SessionId, messages: Vec<Message>) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session::new(id.clone()));
        for message in messages {
            session.push(message);
        }
        session.truncate_to(self.max_messages);
    }

    /// The ordered message history for a session (empty if absent).
    pub async fn history(&self, id: &SessionId) -> Vec<Message> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Current message count for a session.
    pub async fn len(&self, id: &SessionId) -> usize {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.messages.len())
            .unwrap_or(0)
    }

    /// Destroy a session. Returns whether it existed.
    pub async fn reset(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Session reset");
        }
        removed
    }

    /// Ids of all live sessions.
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// The configured retention limit.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_on_first_append() {
        let store = SessionStore::new(100);
        let id = SessionId::from("user-1");
        assert_eq!(store.len(&id).await, 0);

        store.append(&id, Message::user("hello")).await;
        assert_eq!(store.len(&id).await, 1);
        assert_eq!(store.history(&id).await[0].content, "hello");
    }

    #[tokio::test]
    async fn retention_drops_oldest_first() {
        let store = SessionStore::new(6);
        let id = SessionId::from("user-1");
        for i in 0..10 {
            store.append(&id, Message::user(format!("msg {i}"))).await;
        }

        let history = store.history(&id).await;
        assert_eq!(history.len(), 6);
        // Last 6 messages, original relative order.
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 4", "msg 5", "msg 6", "msg 7", "msg 8", "msg 9"]);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::new(100);
        let a = SessionId::from("a");
        let b = SessionId::from("b");

        store.append(&a, Message::user("for a")).await;
        store.append(&b, Message::user("for b")).await;
        store.append(&b, Message::assistant("reply to b")).await;

        assert_eq!(store.len(&a).await, 1);
        assert_eq!(store.len(&b).await, 2);

        store.reset(&a).await;
        assert_eq!(store.len(&a).await, 0);
        assert_eq!(store.len(&b).await, 2);
    }

    #[tokio::test]
    async fn reset_reports_existence() {
        let store = SessionStore::new(100);
        let id = SessionId::from("user-1");

        assert!(!store.reset(&id).await);
        store.append(&id, Message::user("hi")).await;
        assert!(store.reset(&id).await);
        assert!(store.history(&id).await.is_empty());
    }

    #[tokio::test]
    async fn extend_appends_in_order() {
        let store = SessionStore::new(100);
        let id = SessionId::from("user-1");

        store
            .extend(
                &id,
                vec![
                    Message::user("question"),
                    Message::assistant("answer"),
                ],
            )
            .await;

        let history = store.history(&id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "question");
        assert_eq!(history[1].content, "answer");
    }
}
