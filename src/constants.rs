//! Cross-cutting, shared constants.
//!
//! Cache defaults are kept small on purpose: the caches exist to shave tail latency off
//! repeated menu queries, not to hold a corpus.

/// Application name reported by `/health`.
pub const APP_NAME: &str = "smart-menu-ml";

/// Schema segment baked into every cache key. Bump when the key or value layout changes.
pub const KEY_SCHEMA_VERSION: &str = "v1";

/// Locale used when a request carries no usable locale tag.
pub const DEFAULT_LOCALE: &str = "en";

pub const DEFAULT_EMBED_MODEL: &str = "intfloat/multilingual-e5-small";
pub const DEFAULT_RERANK_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// Model label reported by `/health` when the reranker is not loaded.
pub const RERANK_DISABLED_LABEL: &str = "(disabled)";

/// Model label reported by `/rerank` when cosine similarity produced the ranking.
pub const RERANK_FALLBACK_LABEL: &str = "(fallback)";

pub const DEFAULT_EMBED_CACHE_MAX_ITEMS: u64 = 4096;
pub const DEFAULT_EMBED_CACHE_TTL_SECS: u64 = 900;
pub const DEFAULT_RERANK_CACHE_MAX_ITEMS: u64 = 2048;
pub const DEFAULT_RERANK_CACHE_TTL_SECS: u64 = 300;

/// Upper bound accepted for cache TTLs (moka rejects anything past 1000 years).
pub const MAX_CACHE_TTL_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

/// Token budget for both BERT encoders.
pub const DEFAULT_MAX_SEQ_LEN: usize = 512;

/// Model label reported by `/embed` and `/health` while the embedder runs in stub mode.
pub const STUB_EMBED_LABEL: &str = "(stub)";

/// Dimension of the stub embedder (matches `multilingual-e5-small`).
pub const STUB_EMBEDDING_DIM: usize = 384;

/// Response header describing how much of a request was served from cache.
pub const CACHE_STATUS_HEADER: &str = "x-menu-ml-cache";
