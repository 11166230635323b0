//! In-memory caches for embeddings and rankings.

pub mod ttl;
pub mod types;


pub use ttl::{BoundedTtlCache, BoundedTtlCacheHandle};
pub use types::{CacheConfig, CacheStatus, CachedRanking, Embedding, RankedItem, ScoringPath};

/// Cache of unit-normalized embeddings keyed by locale + text.
pub type EmbeddingCache = BoundedTtlCacheHandle<Embedding>;

/// Cache of sorted rankings keyed by locale + query + candidate ids.
pub type RankingCache = BoundedTtlCacheHandle<CachedRanking>;
