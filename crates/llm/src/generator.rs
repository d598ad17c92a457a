//! `rag_core::Generator` implementation wrapping an [`LlmBackend`].

use async_trait::async_trait;

use rag_core::{Generator, Result as CoreResult, SearchResult};

use crate::backend::LlmBackend;
use crate::prompt::build_messages;

pub struct LlmGenerator<B: LlmBackend> {
    backend: B,
}

impl<B: LlmBackend> LlmGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: LlmBackend> Generator for LlmGenerator<B> {
    async fn generate(
        &self,
        query: &str,
        context: &[SearchResult],
        history: &[(String, String)],
    ) -> CoreResult<String> {
        let messages = build_messages(query, context, history);
        let result = self.backend.generate(&messages).await?;
        Ok(result.text)
    }

    fn name(&self) -> &str {
        self.backend.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FinishReason, GenerationResult};
    use crate::prompt::Message;
    use crate::LlmError;

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
            Ok(GenerationResult {
                text: messages.last().unwrap().content.clone(),
                tokens: 1,
                total_time_ms: 0,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn generate_uses_backend() {
        let generator = LlmGenerator::new(EchoBackend);
        let answer = generator.generate("hello", &[], &[]).await.unwrap();
        assert!(answer.contains("hello"));
    }
}
