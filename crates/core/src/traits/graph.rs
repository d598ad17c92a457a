//! Graph store interface (spec §4.3, C4).
//!
//! Two reference backends: an in-memory adjacency graph and a networked
//! (Cypher-speaking) graph database, both behind this trait.

use async_trait::async_trait;

use crate::model::{Entity, GraphSearchResult, Relation};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert by `id` — a second call with the same id is last-write-wins.
    async fn add_entity(&self, entity: Entity) -> Result<()>;

    /// MERGE semantics: at most one edge per `(source_id, target_id, type)`.
    /// Missing endpoints are auto-created as placeholder entities of type
    /// `"unknown"`.
    async fn add_relation(&self, relation: Relation) -> Result<()>;

    async fn get_entity(&self, id: &str) -> Result<Option<Entity>>;

    /// BFS out to `max_depth` hops, exclusive of the starting node, each
    /// reachable entity returned at most once. Traversal is bidirectional
    /// unless the backend is asked to honor relation direction.
    async fn get_neighbors(
        &self,
        id: &str,
        relation_types: Option<&[String]>,
        max_depth: usize,
    ) -> Result<GraphSearchResult>;

    async fn search(
        &self,
        query: &str,
        entity_types: Option<&[String]>,
        top_k: usize,
    ) -> Result<GraphSearchResult>;

    async fn clear(&self) -> Result<()>;

    async fn get_stats(&self) -> Result<GraphStats>;

    async fn health_check(&self) -> bool {
        true
    }
}
