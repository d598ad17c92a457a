//! Provider abstraction: build a [`Generator`](rag_core::Generator) from a
//! closed provider enum instead of a dynamic config map (spec §9).

use std::sync::Arc;

use rag_core::Generator;

use crate::backend::{LlmConfig, OllamaBackend, OpenAIBackend, OpenAIConfig};
use crate::claude::{ClaudeBackend, ClaudeConfig};
use crate::generator::LlmGenerator;
use crate::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Claude,
    Ollama,
    OpenAI,
}

impl LlmProvider {
    pub fn parse_alias(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "claude" | "anthropic" => Some(LlmProvider::Claude),
            "ollama" | "local" => Some(LlmProvider::Ollama),
            "openai" | "gpt" => Some(LlmProvider::OpenAI),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

pub struct LlmFactory;

impl LlmFactory {
    /// Construct the configured generator. Errors here are raised at
    /// construction time, never per request (spec §7 Configuration errors).
    pub fn create(config: &LlmProviderConfig) -> Result<Arc<dyn Generator>, LlmError> {
        match config.provider {
            LlmProvider::Claude => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    LlmError::Configuration("claude provider requires an api_key".to_string())
                })?;
                let backend = ClaudeBackend::new(ClaudeConfig {
                    api_key,
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    ..ClaudeConfig::default()
                })?;
                Ok(Arc::new(LlmGenerator::new(backend)))
            }
            LlmProvider::Ollama => {
                let backend = OllamaBackend::new(LlmConfig {
                    model: config.model.clone(),
                    endpoint: config
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| "http://localhost:11434".to_string()),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    ..LlmConfig::default()
                })?;
                Ok(Arc::new(LlmGenerator::new(backend)))
            }
            LlmProvider::OpenAI => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    LlmError::Configuration("openai provider requires an api_key".to_string())
                })?;
                let backend = OpenAIBackend::new(OpenAIConfig {
                    api_key,
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    ..OpenAIConfig::default()
                })?;
                Ok(Arc::new(LlmGenerator::new(backend)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_claude_without_api_key() {
        let config = LlmProviderConfig {
            provider: LlmProvider::Claude,
            api_key: None,
            endpoint: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 256,
            temperature: 0.7,
        };
        assert!(LlmFactory::create(&config).is_err());
    }

    #[test]
    fn parses_provider_aliases() {
        assert_eq!(LlmProvider::parse_alias("anthropic"), Some(LlmProvider::Claude));
        assert_eq!(LlmProvider::parse_alias("local"), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::parse_alias("gpt"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::parse_alias("unknown"), None);
    }
}
