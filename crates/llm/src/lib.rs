//! Generator backends (Claude, OpenAI, Ollama) implementing
//! [`rag_core::Generator`], plus the factory that builds one from config.

pub mod backend;
pub mod claude;
pub mod error;
pub mod factory;
pub mod generator;
pub mod prompt;

pub use backend::{
    FinishReason, GenerationResult, LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend,
    OpenAIConfig,
};
pub use claude::{ClaudeBackend, ClaudeConfig};
pub use error::LlmError;
pub use factory::{LlmFactory, LlmProvider, LlmProviderConfig};
pub use generator::LlmGenerator;
pub use prompt::{build_messages, Message, Role};
