//! Session store interface (spec §6 external interfaces).
//!
//! Holds per-session chat history so the server can answer
//! `GET /chat/history/{session_id}` without replaying the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub message_id: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self) -> Result<String>;

    async fn append_turn(&self, session_id: &str, turn: ChatTurn) -> Result<()>;

    async fn history(&self, session_id: &str) -> Result<Vec<ChatTurn>>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn exists(&self, session_id: &str) -> Result<bool>;
}
