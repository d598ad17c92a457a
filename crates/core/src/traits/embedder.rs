//! Embedding interface (spec §6 external interfaces).
//!
//! Unlike the other stages, an embedder failure is NOT degraded at its own
//! boundary — it propagates, since a retriever cannot substitute a neutral
//! vector for a missing one (spec §4.2 Failure).

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize;
}
