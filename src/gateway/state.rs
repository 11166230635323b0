use std::sync::Arc;

use crate::service::{EmbeddingOrchestrator, RerankOrchestrator, RerankerTracker};

/// Shared services handed to every request.
#[derive(Clone)]
pub struct HandlerState {
    pub embeddings: Arc<EmbeddingOrchestrator>,

    pub reranker: Arc<RerankOrchestrator>,
}

impl HandlerState {
    pub fn new(embeddings: Arc<EmbeddingOrchestrator>, reranker: Arc<RerankOrchestrator>) -> Self {
        Self {
            embeddings,
            reranker,
        }
    }

    pub fn tracker(&self) -> &Arc<RerankerTracker> {
        self.reranker.tracker()
    }
}
