//! RAG chat server (spec §6 external interfaces).
//!
//! Wires the retrieval orchestrator, Self-RAG pipeline, and persistence
//! stores behind the HTTP surface in [`http`].

pub mod http;
pub mod state;
pub mod wiring;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

/// Server-layer errors — everything below the pipeline/orchestrator
/// boundary already degrades instead of raising (spec §7), so what's left
/// here is startup-time configuration failure and request-shape validation.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rag_core::Error> for ServerError {
    fn from(err: rag_core::Error) -> Self {
        match err {
            rag_core::Error::NotFound(msg) => ServerError::NotFound(msg),
            rag_core::Error::Validation(msg) => ServerError::InvalidRequest(msg),
            rag_core::Error::Configuration(msg) => ServerError::Configuration(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Configuration(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
