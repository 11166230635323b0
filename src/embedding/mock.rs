//! Deterministic collaborators for tests (enabled with the `mock` feature).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::constants::STUB_EMBEDDING_DIM;
use crate::embedding::encoder::hashed_bag_of_words;
use crate::embedding::utils::l2_normalize;
use crate::embedding::{EmbeddingError, PairScorer, RerankerError, ScorerLoader, TextEmbedder};

/// Embedder that records every `encode` call and returns hashed bag-of-words vectors.
#[derive(Debug)]
pub struct MockEmbedder {
    dim: usize,
    calls: Mutex<Vec<Vec<String>>>,
    failing: AtomicBool,
    drop_last: AtomicBool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dim(STUB_EMBEDDING_DIM)
    }

    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim,
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            drop_last: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `encode` calls fail with [`EmbeddingError::InferenceFailed`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes subsequent `encode` calls return one vector fewer than requested.
    pub fn set_drop_last(&self, drop_last: bool) {
        self.drop_last.store(drop_last, Ordering::SeqCst);
    }

    /// Texts passed to each `encode` call, oldest first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The vector this mock produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = hashed_bag_of_words(text, self.dim);
        if v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        l2_normalize(v)
    }
}

impl TextEmbedder for MockEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls
            .lock()
            .push(texts.iter().map(|t| t.to_string()).collect());

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::InferenceFailed {
                reason: "mock embedder failure".to_string(),
            });
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last.load(Ordering::SeqCst) {
            vectors.pop();
        }
        Ok(vectors)
    }
}

/// Pair scorer returning the share of query words that appear in the candidate.
#[derive(Debug, Default)]
pub struct MockScorer {
    calls: Mutex<Vec<Vec<(String, String)>>>,
    failing: AtomicBool,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn overlap(query: &str, candidate: &str) -> f32 {
        let words = |s: &str| -> HashSet<String> {
            s.to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()
        };

        let query_words = words(query);
        if query_words.is_empty() {
            return 0.0;
        }
        let candidate_words = words(candidate);
        query_words.intersection(&candidate_words).count() as f32 / query_words.len() as f32
    }
}

impl PairScorer for MockScorer {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>, RerankerError> {
        self.calls.lock().push(
            pairs
                .iter()
                .map(|(q, c)| (q.to_string(), c.to_string()))
                .collect(),
        );

        if self.failing.load(Ordering::SeqCst) {
            return Err(RerankerError::InferenceFailed {
                reason: "mock scorer failure".to_string(),
            });
        }

        Ok(pairs.iter().map(|(q, c)| Self::overlap(q, c)).collect())
    }
}

/// Loader handing out a shared [`MockScorer`], or failing, while counting attempts.
#[derive(Debug)]
pub struct MockScorerLoader {
    scorer: Arc<MockScorer>,
    succeed: bool,
    delay: Duration,
    loads: AtomicUsize,
}

impl MockScorerLoader {
    pub fn succeeding() -> Self {
        Self {
            scorer: Arc::new(MockScorer::new()),
            succeed: true,
            delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::succeeding()
        }
    }

    /// Sleeps inside `load`, widening the window for concurrent first calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn scorer(&self) -> Arc<MockScorer> {
        Arc::clone(&self.scorer)
    }
}

impl ScorerLoader for MockScorerLoader {
    fn load(&self) -> Result<Arc<dyn PairScorer>, RerankerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if self.succeed {
            Ok(self.scorer.clone())
        } else {
            Err(RerankerError::ModelLoadFailed {
                reason: "mock loader configured to fail".to_string(),
            })
        }
    }
}
