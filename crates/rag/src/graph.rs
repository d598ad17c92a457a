//! In-memory graph store (spec §4.3, C4).
//!
//! Single-process, lost on restart — the reference backend used in
//! development and tests. A networked (Cypher-speaking) backend behind the
//! same [`GraphStore`] trait is a drop-in replacement; it is not shipped
//! here because this workspace has no production graph database wired in
//! (see DESIGN.md).

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use rag_core::{Entity, GraphSearchResult, GraphStats, GraphStore, Relation, Result};

#[derive(Default)]
struct Inner {
    entities: HashMap<String, Entity>,
    /// (source_id, target_id, type) dedup set, MERGE semantics.
    relation_keys: HashSet<(String, String, String)>,
    relations: Vec<Relation>,
    /// Adjacency for BFS, bidirectional: id -> neighbor ids.
    adjacency: HashMap<String, HashSet<String>>,
    /// Optional per-entity embeddings for cosine-similarity search.
    embeddings: HashMap<String, Vec<f32>>,
}

pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Attaches an embedding to an already-added entity, enabling
    /// similarity search instead of substring matching.
    pub fn set_embedding(&self, entity_id: &str, embedding: Vec<f32>) {
        self.inner.write().embeddings.insert(entity_id.to_string(), embedding);
    }

    fn ensure_placeholder(inner: &mut Inner, id: &str) {
        inner.entities.entry(id.to_string()).or_insert_with(|| Entity {
            id: id.to_string(),
            name: id.to_string(),
            entity_type: "unknown".to_string(),
            properties: HashMap::new(),
        });
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn add_entity(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn add_relation(&self, relation: Relation) -> Result<()> {
        let mut inner = self.inner.write();
        Self::ensure_placeholder(&mut inner, &relation.source_id);
        Self::ensure_placeholder(&mut inner, &relation.target_id);

        let key = (
            relation.source_id.clone(),
            relation.target_id.clone(),
            relation.relation_type.clone(),
        );
        if inner.relation_keys.insert(key) {
            inner
                .adjacency
                .entry(relation.source_id.clone())
                .or_default()
                .insert(relation.target_id.clone());
            inner
                .adjacency
                .entry(relation.target_id.clone())
                .or_default()
                .insert(relation.source_id.clone());
            inner.relations.push(relation);
        }
        Ok(())
    }

    async fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.inner.read().entities.get(id).cloned())
    }

    async fn get_neighbors(
        &self,
        id: &str,
        relation_types: Option<&[String]>,
        max_depth: usize,
    ) -> Result<GraphSearchResult> {
        let inner = self.inner.read();
        if !inner.entities.contains_key(id) {
            return Ok(GraphSearchResult::default());
        }

        let mut visited: HashSet<String> = HashSet::from([id.to_string()]);
        let mut queue: VecDeque<(String, usize)> = VecDeque::from([(id.to_string(), 0)]);
        let mut entities = Vec::new();
        let mut relations = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(neighbors) = inner.adjacency.get(&current) else { continue };
            for neighbor in neighbors {
                if visited.contains(neighbor) {
                    continue;
                }
                let connecting = inner.relations.iter().find(|r| {
                    (r.source_id == current && r.target_id == *neighbor)
                        || (r.source_id == *neighbor && r.target_id == current)
                });
                if let Some(relation_types) = relation_types {
                    let matches = connecting
                        .map(|r| relation_types.contains(&r.relation_type))
                        .unwrap_or(false);
                    if !matches {
                        continue;
                    }
                }

                visited.insert(neighbor.clone());
                if let Some(entity) = inner.entities.get(neighbor) {
                    entities.push(entity.clone());
                }
                if let Some(relation) = connecting {
                    relations.push(relation.clone());
                }
                queue.push_back((neighbor.clone(), depth + 1));
            }
        }

        let score = if entities.is_empty() { 0.0 } else { 1.0 };
        Ok(GraphSearchResult { entities, relations, score })
    }

    async fn search(
        &self,
        query: &str,
        entity_types: Option<&[String]>,
        top_k: usize,
    ) -> Result<GraphSearchResult> {
        let inner = self.inner.read();
        let query_lower = query.to_lowercase();

        // Text search falls back to substring name match; callers that want
        // embedding similarity use `search_by_embedding` instead (spec §4.3
        // "falls back to substring name match otherwise").
        let mut scored: Vec<(Entity, f32)> = inner
            .entities
            .values()
            .filter(|e| entity_types.map(|types| types.contains(&e.entity_type)).unwrap_or(true))
            .filter(|e| e.name.to_lowercase().contains(&query_lower))
            .map(|e| (e.clone(), 1.0))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let score = scored.iter().map(|(_, s)| *s).fold(0.0_f32, f32::max);
        let entities = scored.into_iter().map(|(e, _)| e).collect();
        Ok(GraphSearchResult { entities, relations: Vec::new(), score })
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write() = Inner::default();
        Ok(())
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        let inner = self.inner.read();
        Ok(GraphStats {
            entity_count: inner.entities.len(),
            relation_count: inner.relations.len(),
        })
    }
}

/// Cosine-similarity search over entity embeddings, used instead of
/// substring matching when the caller has an embedder wired in. Exposed
/// separately because [`GraphStore::search`] is query-text only.
impl InMemoryGraphStore {
    pub async fn search_by_embedding(
        &self,
        query_embedding: &[f32],
        entity_types: Option<&[String]>,
        top_k: usize,
    ) -> GraphSearchResult {
        let inner = self.inner.read();
        let mut scored: Vec<(Entity, f32)> = inner
            .entities
            .values()
            .filter(|e| entity_types.map(|types| types.contains(&e.entity_type)).unwrap_or(true))
            .filter_map(|e| {
                inner
                    .embeddings
                    .get(&e.id)
                    .map(|emb| (e.clone(), cosine_similarity(query_embedding, emb)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        let score = scored.iter().map(|(_, s)| *s).fold(0.0_f32, f32::max);
        let entities = scored.into_iter().map(|(e, _)| e).collect();
        GraphSearchResult { entities, relations: Vec::new(), score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, doc_id: Option<&str>) -> Entity {
        let mut properties = HashMap::new();
        if let Some(doc_id) = doc_id {
            properties.insert("doc_id".to_string(), doc_id.to_string());
        }
        Entity { id: id.to_string(), name: id.to_string(), entity_type: "topic".to_string(), properties }
    }

    #[tokio::test]
    async fn add_entity_is_idempotent_on_id() {
        let store = InMemoryGraphStore::new();
        store.add_entity(entity("a", None)).await.unwrap();
        store.add_entity(entity("a", Some("doc-1"))).await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.entity_count, 1);
        assert_eq!(store.get_entity("a").await.unwrap().unwrap().doc_id(), Some("doc-1"));
    }

    #[tokio::test]
    async fn add_relation_auto_creates_placeholder_endpoints() {
        let store = InMemoryGraphStore::new();
        store
            .add_relation(Relation {
                source_id: "a".to_string(),
                target_id: "b".to_string(),
                relation_type: "related".to_string(),
                weight: 1.0,
                properties: HashMap::new(),
            })
            .await
            .unwrap();

        assert_eq!(store.get_entity("a").await.unwrap().unwrap().entity_type, "unknown");
        assert_eq!(store.get_entity("b").await.unwrap().unwrap().entity_type, "unknown");
    }

    #[tokio::test]
    async fn add_relation_merges_duplicate_edges() {
        let store = InMemoryGraphStore::new();
        let relation = Relation {
            source_id: "a".to_string(),
            target_id: "b".to_string(),
            relation_type: "related".to_string(),
            weight: 1.0,
            properties: HashMap::new(),
        };
        store.add_relation(relation.clone()).await.unwrap();
        store.add_relation(relation).await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.relation_count, 1);
    }

    #[tokio::test]
    async fn get_neighbors_bfs_excludes_start_and_dedups() {
        let store = InMemoryGraphStore::new();
        for (s, t) in [("a", "b"), ("b", "c"), ("a", "c")] {
            store
                .add_relation(Relation {
                    source_id: s.to_string(),
                    target_id: t.to_string(),
                    relation_type: "related".to_string(),
                    weight: 1.0,
                    properties: HashMap::new(),
                })
                .await
                .unwrap();
        }

        let result = store.get_neighbors("a", None, 2).await.unwrap();
        let ids: HashSet<_> = result.entities.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, HashSet::from(["b".to_string(), "c".to_string()]));
    }

    #[tokio::test]
    async fn search_falls_back_to_substring_match() {
        let store = InMemoryGraphStore::new();
        store.add_entity(entity("gold-loan", Some("doc-1"))).await.unwrap();
        store.add_entity(entity("savings", Some("doc-2"))).await.unwrap();

        let result = store.search("gold", None, 10).await.unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].id, "gold-loan");
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let store = InMemoryGraphStore::new();
        store.add_entity(entity("a", None)).await.unwrap();
        store.clear().await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.entity_count, 0);
    }
}
