//! Model collaborators.
//!
//! - [`encoder`] turns texts into unit-normalized sentence embeddings.
//! - [`reranker`] scores (query, candidate) pairs with a cross-encoder.
//!
//! The orchestration layer in [`crate::service`] only sees the [`TextEmbedder`],
//! [`PairScorer`] and [`ScorerLoader`] traits.

use std::sync::Arc;

/// BERT model heads (bi-encoder and cross-encoder).
pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// Sentence embedder.
pub mod encoder;
/// Cross-encoder reranker.
pub mod reranker;
/// Tokenizer/tensor helpers.
pub mod utils;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use encoder::{BertEmbedder, EncoderConfig};
pub use error::EmbeddingError;
pub use reranker::{CrossEncoder, RerankerConfig, RerankerError};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbedder, MockScorer, MockScorerLoader};

/// Text embedding collaborator.
///
/// Implementations return one unit-normalized vector per input, in input order.
pub trait TextEmbedder: Send + Sync {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cross-encoder collaborator: one relevance score per `(query, candidate)` pair.
pub trait PairScorer: Send + Sync {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>, RerankerError>;
}

/// Produces a [`PairScorer`] on demand. Called at most once per process by
/// [`crate::service::RerankerTracker`].
pub trait ScorerLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn PairScorer>, RerankerError>;
}
