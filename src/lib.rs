//! smart-menu-ml library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Request Orchestration
//! - [`EmbeddingOrchestrator`] - Partial-hit batching over the embedding model
//! - [`RerankOrchestrator`] - Cross-encoder ranking with cosine-similarity fallback
//! - [`RerankerTracker`], [`ModelAvailability`] - Load-once reranker state
//!
//! ## Caching & Keys
//! - [`BoundedTtlCache`], [`EmbeddingCache`], [`RankingCache`] - Capacity + TTL caches
//! - [`LocaleNormalizer`], [`CacheKey`] - Locale canonicalization and key derivation
//!
//! ## Models
//! - [`TextEmbedder`], [`PairScorer`], [`ScorerLoader`] - Collaborator traits
//! - [`BertEmbedder`], [`CrossEncoder`] - candle BERT implementations
//!
//! ## Server
//! - [`Config`] - Environment configuration
//! - [`gateway::create_router_with_state`] - Axum router
//!
//! ## Test/Mock Support
//! Mock collaborators are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod keys;
pub mod service;

pub use cache::{
    BoundedTtlCache, BoundedTtlCacheHandle, CacheConfig, CacheStatus, CachedRanking, Embedding,
    EmbeddingCache, RankedItem, RankingCache, ScoringPath,
};
pub use config::{Config, ConfigError};
pub use embedding::{
    BertEmbedder, CrossEncoder, EmbeddingError, EncoderConfig, PairScorer, RerankerConfig,
    RerankerError, ScorerLoader, TextEmbedder,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockEmbedder, MockScorer, MockScorerLoader};
pub use gateway::{GatewayError, HandlerState, create_router_with_state};
pub use keys::{CacheKey, LocaleNormalizer, embed_key, rerank_key};
pub use service::{
    EmbeddedBatch, EmbeddingOrchestrator, ModelAvailability, RerankCandidate, RerankOrchestrator,
    RerankOutcome, RerankerTracker, ServiceError,
};
