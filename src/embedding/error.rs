use std::path::PathBuf;
use thiserror::Error;

/// Failures of the sentence embedder, from loading the model through a forward pass.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model directory not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("embedder could not be loaded: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("embedding batch failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("menu text could not be tokenized: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid embedder settings: {reason}")]
    InvalidConfig { reason: String },

    /// The embedder answered with a different number of vectors than texts it was given.
    #[error("embedder returned {actual} vectors for {expected} texts")]
    OutputMismatch { expected: usize, actual: usize },
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
