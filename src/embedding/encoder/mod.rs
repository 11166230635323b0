//! Sentence embedder (BERT bi-encoder + tokenizer).
//!
//! Use [`EncoderConfig::stub`] for tests and model-less runs: the stub hashes lowercase
//! word tokens into a fixed number of buckets, so texts that share words score a positive
//! cosine similarity.

/// Encoder configuration.
pub mod config;


pub use config::EncoderConfig;

use std::hash::{DefaultHasher, Hash, Hasher};

use candle_core::Device;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use super::TextEmbedder;
use crate::constants::STUB_EMBED_LABEL;
use crate::embedding::bert::BertEncoder;
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::utils::{batch_tensors, l2_normalize, load_tokenizer};

enum EncoderBackend {
    Model {
        model: BertEncoder,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub,
}

/// Embedding generator producing unit-normalized vectors (supports stub mode).
pub struct BertEmbedder {
    backend: EncoderBackend,
    config: EncoderConfig,
    dim: usize,
}

impl std::fmt::Debug for BertEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertEmbedder")
            .field(
                "backend",
                &match &self.backend {
                    EncoderBackend::Model { device, .. } => format!("Model({:?})", device),
                    EncoderBackend::Stub => "Stub".to_string(),
                },
            )
            .field("dim", &self.dim)
            .field("max_seq_len", &self.config.max_seq_len)
            .finish()
    }
}

impl BertEmbedder {
    /// Loads the embedder from a config (stub mode is supported).
    pub fn load(config: EncoderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        if config.testing_stub {
            warn!(dim = config.stub_dim, "Embedder running in STUB mode");
            return Ok(Self {
                backend: EncoderBackend::Stub,
                dim: config.stub_dim,
                config,
            });
        }

        if !config.model_available() {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: format!(
                    "expected config.json, model.safetensors and tokenizer.json in {}",
                    config.model_dir.display()
                ),
            });
        }

        let device = select_device();
        debug!(?device, "Selected compute device for embedder");

        let tokenizer = load_tokenizer(&config.model_dir, config.max_seq_len).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        let model = BertEncoder::load(&config.model_dir, &device).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to load BERT encoder: {}", e),
            }
        })?;

        let dim = model.hidden_size();
        info!(
            model_dir = %config.model_dir.display(),
            dim,
            max_seq_len = config.max_seq_len,
            "Embedding model loaded"
        );

        Ok(Self {
            backend: EncoderBackend::Model {
                model,
                tokenizer,
                device,
            },
            config,
            dim,
        })
    }

    fn encode_with_model(
        &self,
        texts: &[&str],
        model: &BertEncoder,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let (input_ids, type_ids, attention_mask) = batch_tensors(&encodings, device)?;
        debug!(
            batch = texts.len(),
            seq_len = input_ids.dim(1)?,
            "Running encoder forward pass"
        );

        let pooled = model
            .forward(&input_ids, &type_ids, &attention_mask)
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("Encoder forward pass failed: {}", e),
            })?;

        Ok(pooled
            .to_vec2::<f32>()?
            .into_iter()
            .map(l2_normalize)
            .collect())
    }

    fn encode_stub(&self, text: &str) -> Vec<f32> {
        let mut embedding = hashed_bag_of_words(text, self.dim);

        if embedding.iter().all(|x| *x == 0.0) {
            embedding = seeded_vector(text, self.dim);
        }

        l2_normalize(embedding)
    }

    /// Returns the output embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns `true` if running in stub mode.
    pub fn is_stub(&self) -> bool {
        matches!(self.backend, EncoderBackend::Stub)
    }

    /// Label to report for this embedder: `configured` for a loaded model,
    /// [`STUB_EMBED_LABEL`] in stub mode.
    pub fn model_label(&self, configured: &str) -> String {
        if self.is_stub() {
            STUB_EMBED_LABEL.to_string()
        } else {
            configured.to_string()
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}

impl TextEmbedder for BertEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            EncoderBackend::Model {
                model,
                tokenizer,
                device,
            } => self.encode_with_model(texts, model, tokenizer, device),
            EncoderBackend::Stub => Ok(texts.iter().map(|t| self.encode_stub(t)).collect()),
        }
    }
}

fn hash_token(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

/// Signed feature hashing of lowercase alphanumeric tokens into `dim` buckets (unnormalized).
pub(crate) fn hashed_bag_of_words(text: &str, dim: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dim];
    if dim == 0 {
        return embedding;
    }

    let lowered = text.to_lowercase();
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let h = hash_token(token);
        let bucket = (h % dim as u64) as usize;
        let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
        embedding[bucket] += sign;
    }

    embedding
}

/// Pseudo-random vector seeded by the whole text, for inputs with no word tokens.
fn seeded_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut state = hash_token(text);

    (0..dim)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}
