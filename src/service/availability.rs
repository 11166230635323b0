//! Lazy, load-once tracking of the cross-encoder reranker.
//!
//! State only moves forward: `NotAttempted` → `Loaded` or `NotAttempted` → `Unavailable`.
//! A failed load is never retried within the process.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::constants::RERANK_DISABLED_LABEL;
use crate::embedding::{PairScorer, ScorerLoader};

/// Observable reranker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelAvailability {
    NotAttempted,
    Loaded,
    Unavailable,
}

impl ModelAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAvailability::NotAttempted => "not_attempted",
            ModelAvailability::Loaded => "loaded",
            ModelAvailability::Unavailable => "unavailable",
        }
    }
}

enum TrackerState {
    NotAttempted,
    Loaded(Arc<dyn PairScorer>),
    Unavailable,
}

impl TrackerState {
    fn availability(&self) -> ModelAvailability {
        match self {
            TrackerState::NotAttempted => ModelAvailability::NotAttempted,
            TrackerState::Loaded(_) => ModelAvailability::Loaded,
            TrackerState::Unavailable => ModelAvailability::Unavailable,
        }
    }
}

/// Owns the reranker handle and loads it at most once.
///
/// Readers take the `RwLock` in shared mode; the first caller to find the state
/// `NotAttempted` takes `load_gate`, re-checks, and performs the single load.
pub struct RerankerTracker {
    enabled: bool,
    model_id: String,
    loader: Arc<dyn ScorerLoader>,
    state: RwLock<TrackerState>,
    load_gate: Mutex<()>,
}

impl std::fmt::Debug for RerankerTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankerTracker")
            .field("enabled", &self.enabled)
            .field("model_id", &self.model_id)
            .field("availability", &self.availability())
            .finish()
    }
}

impl RerankerTracker {
    pub fn new(loader: Arc<dyn ScorerLoader>, model_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            enabled,
            model_id: model_id.into(),
            loader,
            state: RwLock::new(TrackerState::NotAttempted),
            load_gate: Mutex::new(()),
        }
    }

    /// Returns `true` once the reranker is usable, loading it on the first call.
    pub fn ensure_loaded(&self) -> bool {
        if !self.enabled {
            return false;
        }

        match self.availability() {
            ModelAvailability::Loaded => return true,
            ModelAvailability::Unavailable => return false,
            ModelAvailability::NotAttempted => {}
        }

        let _gate = self.load_gate.lock();

        match self.availability() {
            ModelAvailability::Loaded => true,
            ModelAvailability::Unavailable => false,
            ModelAvailability::NotAttempted => self.load_once(),
        }
    }

    // Caller holds `load_gate`.
    fn load_once(&self) -> bool {
        debug!(model = %self.model_id, "Attempting reranker load");

        match self.loader.load() {
            Ok(scorer) => {
                *self.state.write() = TrackerState::Loaded(scorer);
                info!(model = %self.model_id, "Reranker loaded");
                true
            }
            Err(e) => {
                *self.state.write() = TrackerState::Unavailable;
                warn!(
                    model = %self.model_id,
                    error = %e,
                    "Reranker unavailable, ranking with cosine similarity for the rest of the process"
                );
                false
            }
        }
    }

    /// The loaded scorer, without triggering a load.
    pub fn scorer(&self) -> Option<Arc<dyn PairScorer>> {
        match &*self.state.read() {
            TrackerState::Loaded(scorer) => Some(Arc::clone(scorer)),
            _ => None,
        }
    }

    /// [`ensure_loaded`](Self::ensure_loaded), then the scorer if it is loaded.
    pub fn acquire(&self) -> Option<Arc<dyn PairScorer>> {
        if self.ensure_loaded() {
            self.scorer()
        } else {
            None
        }
    }

    pub fn availability(&self) -> ModelAvailability {
        self.state.read().availability()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Model id while loaded, `"(disabled)"` otherwise.
    pub fn health_label(&self) -> &str {
        if self.availability() == ModelAvailability::Loaded {
            &self.model_id
        } else {
            RERANK_DISABLED_LABEL
        }
    }
}
