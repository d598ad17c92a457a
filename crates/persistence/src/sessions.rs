//! In-memory chat session store (spec §6: `GET /chat/history/{session_id}`
//! and friends). Sessions are not durable across restarts — there is no
//! database driver in this workspace's dependency stack, so the default
//! (and only) implementation keeps history behind a `parking_lot::RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rag_core::{ChatTurn, Error, Result, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.write().insert(id.clone(), Vec::new());
        tracing::info!(session_id = %id, "created session");
        Ok(id)
    }

    async fn append_turn(&self, session_id: &str, turn: rag_core::ChatTurn) -> Result<()> {
        let mut sessions = self.sessions.write();
        let turns = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        turns.push(turn);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions.write().remove(session_id);
        tracing::info!(session_id = %session_id, "deleted session");
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.read().contains_key(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turn(query: &str) -> ChatTurn {
        ChatTurn {
            message_id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            response: "answer".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_append_then_history_round_trips() {
        let store = InMemorySessionStore::new();
        let id = store.create_session().await.unwrap();
        store.append_turn(&id, turn("hi")).await.unwrap();
        store.append_turn(&id, turn("again")).await.unwrap();

        let history = store.history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "hi");
    }

    #[tokio::test]
    async fn append_to_unknown_session_returns_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.append_turn("missing", turn("hi")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn exists_reflects_creation_and_deletion() {
        let store = InMemorySessionStore::new();
        let id = store.create_session().await.unwrap();
        assert!(store.exists(&id).await.unwrap());

        store.delete_session(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn history_of_unknown_session_returns_not_found() {
        let store = InMemorySessionStore::new();
        assert!(store.history("missing").await.is_err());
    }
}
