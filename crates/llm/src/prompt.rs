//! Message types and RAG prompt assembly.

use serde::{Deserialize, Serialize};

use rag_core::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a retrieval-augmented assistant. Answer the user's \
question using only the provided context documents. If the context does not contain \
the answer, say so plainly instead of guessing.";

/// Assemble the message list fed to a generator: system prompt, prior
/// turns (oldest first), a context block built from `documents`, then the
/// current query.
pub fn build_messages(
    query: &str,
    documents: &[SearchResult],
    history: &[(String, String)],
) -> Vec<Message> {
    let mut messages = vec![Message::system(SYSTEM_PROMPT)];

    for (user, assistant) in history {
        messages.push(Message::user(user.clone()));
        messages.push(Message::assistant(assistant.clone()));
    }

    let context = if documents.is_empty() {
        "(no context documents were retrieved)".to_string()
    } else {
        documents
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("[{}] {}", i + 1, doc.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    messages.push(Message::user(format!(
        "Context:\n{context}\n\nQuestion: {query}"
    )));

    messages
}
