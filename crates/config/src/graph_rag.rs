//! C4/C6 graph store and hybrid search configuration (spec §4.3, §4.5, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphRagConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: GraphProvider,
    #[serde(default)]
    pub hybrid_search: HybridSearchConfig,
    #[serde(default)]
    pub neo4j: Neo4jConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphProvider {
    #[default]
    Networkx,
    Neo4j,
}

/// Hybrid search is enabled by default whenever a graph store is wired
/// (spec §4.7): `enabled` gates whether the orchestrator *may* use hybrid
/// search at all; `auto_enable` gates whether it does so without an
/// explicit `use_graph` override on the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auto_enable: bool,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    #[serde(default = "default_graph_weight")]
    pub graph_weight: f32,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_enable: false,
            vector_weight: default_vector_weight(),
            graph_weight: default_graph_weight(),
            rrf_k: default_rrf_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_neo4j_database")]
    pub database: String,
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            database: default_neo4j_database(),
            connection_pool: ConnectionPoolConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionPoolConfig {
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
    #[serde(default = "default_acquisition_timeout_secs")]
    pub acquisition_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: default_max_pool_size(),
            acquisition_timeout_secs: default_acquisition_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_vector_weight() -> f32 {
    0.6
}
fn default_graph_weight() -> f32 {
    0.4
}
fn default_rrf_k() -> f32 {
    60.0
}
fn default_neo4j_database() -> String {
    "neo4j".to_string()
}
fn default_max_pool_size() -> usize {
    50
}
fn default_acquisition_timeout_secs() -> u64 {
    30
}
fn default_query_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    200
}
