//! Cache layer interface (spec §4.1, C2).

use async_trait::async_trait;

use crate::model::SearchResult;
use crate::traits::retriever::Filters;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub invalidations: u64,
    pub current_size: usize,
    pub max_size: usize,
    pub saved_time_ms: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[async_trait]
pub trait CacheManager: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>>;

    async fn set(&self, key: &str, value: Vec<SearchResult>, ttl_secs: Option<u64>)
        -> Result<()>;

    async fn invalidate(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    fn stats(&self) -> CacheStats;
}

/// `SHA-256(query "|" top_k "|" sorted(filters))` (spec §4.1 key derivation).
pub fn generate_cache_key(query: &str, top_k: usize, filters: Option<&Filters>) -> String {
    use sha2::{Digest, Sha256};

    let mut parts = vec![query.to_string(), top_k.to_string()];
    if let Some(filters) = filters {
        if !filters.is_empty() {
            let mut pairs: Vec<(&String, &String)> = filters.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let rendered = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            parts.push(rendered);
        }
    }
    let combined = parts.join("|");

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_under_filter_order() {
        let mut f1 = Filters::new();
        f1.insert("a".into(), "1".into());
        f1.insert("b".into(), "2".into());

        let mut f2 = Filters::new();
        f2.insert("b".into(), "2".into());
        f2.insert("a".into(), "1".into());

        assert_eq!(
            generate_cache_key("q", 5, Some(&f1)),
            generate_cache_key("q", 5, Some(&f2))
        );
    }

    #[test]
    fn cache_key_changes_with_top_k() {
        assert_ne!(generate_cache_key("q", 5, None), generate_cache_key("q", 10, None));
    }
}
