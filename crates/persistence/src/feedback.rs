//! In-memory feedback store (spec §6: `POST /chat/feedback`, and the
//! golden-candidate seed for `RagasEvaluator`/`InternalEvaluator` batch runs).

use async_trait::async_trait;
use parking_lot::RwLock;
use rag_core::{FeedbackData, FeedbackStore, Result};

#[derive(Default)]
pub struct InMemoryFeedbackStore {
    entries: RwLock<Vec<FeedbackData>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn record(&self, feedback: FeedbackData) -> Result<()> {
        tracing::info!(
            session_id = %feedback.session_id,
            message_id = %feedback.message_id,
            "recorded feedback"
        );
        self.entries.write().push(feedback);
        Ok(())
    }

    async fn golden_candidates(&self, limit: usize) -> Result<Vec<FeedbackData>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|f| f.is_golden_candidate())
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rag_core::Rating;

    fn feedback(rating: Rating, with_text: bool) -> FeedbackData {
        FeedbackData {
            session_id: "s1".to_string(),
            message_id: uuid::Uuid::new_v4().to_string(),
            rating,
            comment: None,
            query: with_text.then(|| "what is the rate?".to_string()),
            response: with_text.then(|| "the rate is 7%".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn golden_candidates_only_include_upvoted_with_text() {
        let store = InMemoryFeedbackStore::new();
        store.record(feedback(Rating::Up, true)).await.unwrap();
        store.record(feedback(Rating::Down, true)).await.unwrap();
        store.record(feedback(Rating::Up, false)).await.unwrap();

        let golden = store.golden_candidates(10).await.unwrap();
        assert_eq!(golden.len(), 1);
    }

    #[tokio::test]
    async fn golden_candidates_respects_limit() {
        let store = InMemoryFeedbackStore::new();
        for _ in 0..5 {
            store.record(feedback(Rating::Up, true)).await.unwrap();
        }
        let golden = store.golden_candidates(2).await.unwrap();
        assert_eq!(golden.len(), 2);
    }
}
