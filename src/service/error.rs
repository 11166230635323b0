use thiserror::Error;

use crate::embedding::{EmbeddingError, RerankerError};

/// Failures surfaced by the embedding and rerank orchestrators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The embedding model never finished loading; nothing can be served.
    #[error("embedding model is not ready")]
    ModelUnready,

    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Reranker(#[from] RerankerError),
}

impl ServiceError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        ServiceError::Validation {
            reason: reason.into(),
        }
    }
}
