//! Request orchestration: cache lookups, collaborator calls, and the rerank fallback.
//!
//! All entry points are synchronous and may run model inference; the HTTP layer calls
//! them from `spawn_blocking`.

pub mod availability;
pub mod embed;
pub mod error;
pub mod rerank;


pub use availability::{ModelAvailability, RerankerTracker};
pub use embed::{EmbeddedBatch, EmbeddingOrchestrator};
pub use error::ServiceError;
pub use rerank::{RerankCandidate, RerankOrchestrator, RerankOutcome};
