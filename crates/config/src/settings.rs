//! Top-level settings aggregate and layered loader.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::evaluation::EvaluationConfig;
use crate::graph_rag::GraphRagConfig;
use crate::reranking::RerankingConfig;
use crate::retrieval::{QueryExpansionConfig, RagConfig, RetrievalFilterConfig, SelfRagConfig};
use crate::scoring::ScoringConfig;
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Every recognized config section (spec §6 "Config schema"). Anything
/// absent from the loaded sources falls back to its documented default —
/// none of these are required.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reranking: RerankingConfig,
    #[serde(default)]
    pub graph_rag: GraphRagConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub query_expansion: QueryExpansionConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub retrieval: RetrievalFilterConfig,
    #[serde(default)]
    pub self_rag: SelfRagConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.top_k".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.self_rag.accept_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "self_rag.accept_threshold".to_string(),
                message: "must be in [0, 1]".to_string(),
            });
        }
        if self.self_rag.regenerate_threshold > self.self_rag.accept_threshold {
            return Err(ConfigError::InvalidValue {
                field: "self_rag.regenerate_threshold".to_string(),
                message: "must not exceed accept_threshold".to_string(),
            });
        }
        Ok(())
    }
}

/// Layered load: `config/default.{toml,yaml}` → `config/{env}.{toml,yaml}`
/// → environment variables prefixed `RAG__` (double-underscore nested
/// separator, e.g. `RAG__SELF_RAG__ENABLED=true`).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("RAG")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.rag.top_k, 15);
    }

    #[test]
    fn rejects_regenerate_above_accept() {
        let mut settings = Settings::default();
        settings.self_rag.accept_threshold = 0.5;
        settings.self_rag.regenerate_threshold = 0.6;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn scoring_default_is_plain_system() {
        let scoring = ScoringConfig::default();
        assert!(!scoring.collection_weight_enabled);
        assert!(!scoring.file_type_weight_enabled);
    }
}
