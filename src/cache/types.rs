use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Capacity and time-to-live for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries (least-recently-used evicted first).
    pub max_items: u64,
    /// Entry lifetime; zero means every entry is immediately stale.
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(max_items: u64, ttl: Duration) -> Self {
        Self { max_items, ttl }
    }

    pub fn from_secs(max_items: u64, ttl_secs: u64) -> Self {
        Self::new(max_items, Duration::from_secs(ttl_secs))
    }

    pub fn max_items(mut self, n: u64) -> Self {
        self.max_items = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Unit-normalized embedding shared between the cache and every response that uses it.
pub type Embedding = Arc<[f32]>;

/// One scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub id: String,
    pub score: f32,
}

/// Which scorer produced a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringPath {
    /// Cross-encoder scores.
    Reranker,
    /// Cosine similarity of embeddings.
    Fallback,
}

impl ScoringPath {
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, ScoringPath::Fallback)
    }
}

/// A ranking as stored in the rerank cache. Immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRanking {
    pub items: Arc<[RankedItem]>,
    pub scored_by: ScoringPath,
}

/// How much of a request was answered from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    Hit,
    Partial,
    Miss,
}

impl CacheStatus {
    /// Classifies a batch by how many of its `total` items were hits.
    pub fn from_counts(hits: usize, total: usize) -> Self {
        if total > 0 && hits == total {
            CacheStatus::Hit
        } else if hits == 0 {
            CacheStatus::Miss
        } else {
            CacheStatus::Partial
        }
    }

    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Partial => "PARTIAL",
            CacheStatus::Miss => "MISS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}
