use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::DEFAULT_MAX_SEQ_LEN;
use crate::embedding::{PairScorer, ScorerLoader};

use super::{CrossEncoder, RerankerError};

pub const MAX_SEQ_LEN: usize = DEFAULT_MAX_SEQ_LEN;

#[derive(Debug, Clone, Default)]
pub struct RerankerConfig {
    /// Local cross-encoder directory. `None` means loading always fails (fallback scoring).
    pub model_path: Option<PathBuf>,

    pub max_seq_len: Option<usize>,
}

impl RerankerConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            max_seq_len: None,
        }
    }

    /// A config with no model path; [`CrossEncoder::load`] rejects it.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = Some(max_seq_len);
        self
    }

    pub fn seq_len(&self) -> usize {
        self.max_seq_len.unwrap_or(MAX_SEQ_LEN)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_seq_len == Some(0) {
            return Err("max_seq_len must be positive".to_string());
        }

        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err("model_path cannot be empty when provided".to_string());
        }

        Ok(())
    }
}

impl ScorerLoader for RerankerConfig {
    fn load(&self) -> Result<Arc<dyn PairScorer>, RerankerError> {
        let scorer = CrossEncoder::load(self.clone())?;
        Ok(Arc::new(scorer))
    }
}
