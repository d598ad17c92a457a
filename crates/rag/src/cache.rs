//! Cache layer (spec §4.1, C2).
//!
//! Two concrete variants behind [`rag_core::CacheManager`]: an in-memory LRU
//! cache with lazy TTL expiry, and a semantic cache that hits on embedding
//! similarity rather than exact key match.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use rag_core::{CacheManager, CacheStats, Result, SearchResult};

struct Entry {
    value: Vec<SearchResult>,
    expires_at: Option<Instant>,
}

/// LRU in-memory cache with lazy TTL expiry (spec §4.1).
pub struct MemoryCacheManager {
    cache: Mutex<LruCache<String, Entry>>,
    default_ttl: Option<Duration>,
    maxsize: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    invalidations: AtomicU64,
    saved_time_ms: AtomicU64,
}

impl MemoryCacheManager {
    pub fn new(maxsize: usize, default_ttl_secs: Option<u64>) -> Self {
        let capacity = NonZeroUsize::new(maxsize.max(1)).unwrap();
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            default_ttl: default_ttl_secs.map(Duration::from_secs),
            maxsize,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            saved_time_ms: AtomicU64::new(0),
        }
    }

    /// Records time saved by serving a cache hit instead of a live search.
    pub fn record_saved_time(&self, duration_ms: u64) {
        self.saved_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheManager for MemoryCacheManager {
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>> {
        let mut cache = self.cache.lock();
        let expired = matches!(cache.peek(key), Some(entry) if entry.expires_at.is_some_and(|e| Instant::now() > e));
        if expired {
            cache.pop(key);
        }
        match cache.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<SearchResult>, ttl_secs: Option<u64>) -> Result<()> {
        let expires_at = ttl_secs
            .map(Duration::from_secs)
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        self.cache.lock().put(key.to_string(), Entry { value, expires_at });
        self.sets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.cache.lock().pop(key);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.lock().clear();
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            current_size: self.cache.lock().len(),
            max_size: self.maxsize,
            saved_time_ms: self.saved_time_ms.load(Ordering::Relaxed),
        }
    }
}

struct SemanticEntry {
    embedding: Vec<f32>,
    value: Vec<SearchResult>,
    expires_at: Option<Instant>,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Cache that hits on embedding similarity rather than exact key match
/// (spec §4.1). Callers supply the query embedding alongside the key.
pub struct SemanticCacheManager {
    entries: Mutex<LruCache<String, SemanticEntry>>,
    similarity_threshold: f32,
    default_ttl: Option<Duration>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    invalidations: AtomicU64,
}

impl SemanticCacheManager {
    pub fn new(max_entries: usize, similarity_threshold: f32, default_ttl_secs: Option<u64>) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            similarity_threshold,
            default_ttl: default_ttl_secs.map(Duration::from_secs),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Look up by embedding similarity: the nearest non-expired entry at or
    /// above `similarity_threshold`, or a miss.
    pub async fn get_similar(&self, embedding: &[f32]) -> Option<Vec<SearchResult>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let best = entries
            .iter()
            .filter(|(_, e)| e.expires_at.map(|exp| now <= exp).unwrap_or(true))
            .map(|(k, e)| (k.clone(), cosine_similarity(embedding, &e.embedding)))
            .filter(|(_, sim)| *sim >= self.similarity_threshold)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((key, _)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entries.get(&key).map(|e| e.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set_with_embedding(
        &self,
        key: &str,
        embedding: Vec<f32>,
        value: Vec<SearchResult>,
        ttl_secs: Option<u64>,
    ) {
        let expires_at = ttl_secs
            .map(Duration::from_secs)
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        self.entries.lock().put(
            key.to_string(),
            SemanticEntry { embedding, value, expires_at },
        );
        self.sets.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheManager for SemanticCacheManager {
    /// Exact-key lookup is not the semantic cache's mode of operation;
    /// callers should use [`Self::get_similar`]. Still correct as a
    /// fallback exact match so this type satisfies the shared interface.
    async fn get(&self, key: &str) -> Result<Option<Vec<SearchResult>>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired = matches!(entries.peek(key), Some(e) if e.expires_at.is_some_and(|exp| now > exp));
        if expired {
            entries.pop(key);
        }
        match entries.get(key) {
            Some(e) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(e.value.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<SearchResult>, ttl_secs: Option<u64>) -> Result<()> {
        self.set_with_embedding(key, Vec::new(), value, ttl_secs).await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.lock().pop(key);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            current_size: self.entries.lock().len(),
            max_size: self.max_entries,
            saved_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str) -> SearchResult {
        SearchResult::new(id, "content", 0.5)
    }

    #[tokio::test]
    async fn hits_after_set_and_misses_otherwise() {
        let cache = MemoryCacheManager::new(10, Some(3600));
        assert!(cache.get("k").await.unwrap().is_none());
        cache.set("k", vec![result("a")], None).await.unwrap();
        let hit = cache.get("k").await.unwrap();
        assert_eq!(hit.unwrap()[0].id, "a");
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn ttl_expiry_is_lazy() {
        let cache = MemoryCacheManager::new(10, None);
        cache.set("k", vec![result("a")], Some(0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = MemoryCacheManager::new(10, Some(3600));
        cache.set("k", vec![result("a")], None).await.unwrap();
        cache.invalidate("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn semantic_cache_hits_on_similarity() {
        let cache = SemanticCacheManager::new(10, 0.9, Some(3600));
        cache
            .set_with_embedding("k1", vec![1.0, 0.0, 0.0], vec![result("a")], None)
            .await;
        let hit = cache.get_similar(&[0.99, 0.01, 0.0]).await;
        assert!(hit.is_some());
        let miss = cache.get_similar(&[0.0, 1.0, 0.0]).await;
        assert!(miss.is_none());
    }
}
