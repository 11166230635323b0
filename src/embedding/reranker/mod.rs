pub mod config;
pub mod error;


pub use config::{MAX_SEQ_LEN, RerankerConfig};
pub use error::RerankerError;

use candle_core::Device;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embedding::PairScorer;
use crate::embedding::bert::BertClassifier;
use crate::embedding::device::select_device;
use crate::embedding::utils::{batch_tensors, load_tokenizer, sigmoid};

/// Cross-encoder scoring `(query, candidate)` pairs into `[0, 1]` relevance scores.
pub struct CrossEncoder {
    device: Device,
    config: RerankerConfig,
    model: BertClassifier,
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for CrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoder")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .finish()
    }
}

impl CrossEncoder {
    pub fn load(config: RerankerConfig) -> Result<Self, RerankerError> {
        if let Err(msg) = config.validate() {
            return Err(RerankerError::InvalidConfig { reason: msg });
        }

        let Some(model_path) = config.model_path.clone() else {
            return Err(RerankerError::ModelLoadFailed {
                reason: "no reranker model path configured".to_string(),
            });
        };

        if !model_path.exists() {
            return Err(RerankerError::ModelNotFound { path: model_path });
        }

        for file in ["config.json", "model.safetensors"] {
            if !model_path.join(file).exists() {
                return Err(RerankerError::ModelLoadFailed {
                    reason: format!("Missing {} in {}", file, model_path.display()),
                });
            }
        }

        let device = select_device();
        debug!(?device, "Selected compute device for reranker");

        info!(model_path = %model_path.display(), "Loading reranker model");

        let model = BertClassifier::load(&model_path, &device).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load BERT model: {}", e),
            }
        })?;

        let tokenizer = load_tokenizer(&model_path, config.seq_len()).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!("Reranker model loaded successfully");

        Ok(Self {
            device,
            config,
            model,
            tokenizer,
        })
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl PairScorer for CrossEncoder {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>, RerankerError> {
        if pairs.is_empty() {
            return Ok(vec![]);
        }

        debug!(pairs = pairs.len(), "Scoring query-candidate pairs");

        let inputs: Vec<(String, String)> = pairs
            .iter()
            .map(|(q, c)| (q.to_string(), c.to_string()))
            .collect();
        let encodings = self.tokenizer.encode_batch(inputs, true).map_err(|e| {
            RerankerError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let (input_ids, type_ids, attention_mask) = batch_tensors(&encodings, &self.device)?;

        let logits = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))
            .map_err(|e| RerankerError::InferenceFailed {
                reason: e.to_string(),
            })?;

        let scores: Vec<f32> = logits
            .flatten_all()?
            .to_vec1::<f32>()?
            .into_iter()
            .map(sigmoid)
            .collect();

        if scores.len() != pairs.len() {
            return Err(RerankerError::OutputMismatch {
                expected: pairs.len(),
                actual: scores.len(),
            });
        }

        debug!(
            top_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            "Pair scoring complete"
        );

        Ok(scores)
    }
}
