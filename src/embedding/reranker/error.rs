use std::path::PathBuf;
use thiserror::Error;

/// Failures of the cross-encoder. Any of these during load marks the reranker unavailable;
/// during scoring they fail the request.
#[derive(Debug, Error)]
pub enum RerankerError {
    #[error("cross-encoder model directory not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("cross-encoder could not be loaded: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("scoring (query, candidate) pairs failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("query or candidate text could not be tokenized: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid reranker settings: {reason}")]
    InvalidConfig { reason: String },

    #[error("cross-encoder returned {actual} scores for {expected} candidates")]
    OutputMismatch { expected: usize, actual: usize },
}

impl From<candle_core::Error> for RerankerError {
    fn from(err: candle_core::Error) -> Self {
        RerankerError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
