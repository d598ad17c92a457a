//! C2 cache layer configuration (spec §4.1, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum CacheConfig {
    Memory(MemoryCacheConfig),
    Redis(RedisCacheConfig),
    Semantic(SemanticCacheConfig),
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory(MemoryCacheConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    #[serde(default = "default_maxsize")]
    pub maxsize: usize,
    #[serde(default = "default_ttl")]
    pub ttl: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            maxsize: default_maxsize(),
            ttl: default_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            prefix: default_redis_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_maxsize")]
    pub max_entries: usize,
    #[serde(default = "default_ttl")]
    pub ttl: u64,
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_entries: default_maxsize(),
            ttl: default_ttl(),
        }
    }
}

fn default_maxsize() -> usize {
    1000
}

fn default_ttl() -> u64 {
    3600
}

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_redis_prefix() -> String {
    "rag:cache:".to_string()
}
