//! BERT-family model heads on top of `candle_transformers::models::bert`.
//!
//! Checkpoints in the wild store the encoder under `bert.`, `roberta.`, or no prefix at all;
//! [`load_bert`] checks for each and returns the prefix it found.

use candle::{DType, Device, Result, Tensor};
use candle_core as candle;
use candle_core::IndexOp;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;
use std::sync::Arc;

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<(VarBuilder<'static>, Config)> {
    let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
    let config: Config = serde_json::from_str(&config_content)
        .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))?;

    let weights_path = model_dir.join("model.safetensors");
    // SAFETY: the weights file is treated as read-only for the lifetime of the process.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };

    Ok((vb, config))
}

/// Loads the encoder and returns it with the tensor-name prefix it lives under.
fn load_bert(vb: &VarBuilder, config: &Config) -> Result<(BertModel, Option<&'static str>)> {
    for prefix in ["bert", "roberta"] {
        if vb.contains_tensor(&format!("{prefix}.embeddings.word_embeddings.weight")) {
            return Ok((BertModel::load(vb.pp(prefix), config)?, Some(prefix)));
        }
    }
    Ok((BertModel::load(vb.clone(), config)?, None))
}

struct ClassifierInner {
    bert: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
}

/// Cross-encoder: BERT + pooler + a single-logit classification head over the `[CLS]` token.
///
/// The logit is `classifier(tanh(pooler.dense(cls)))`. Checkpoints that ship no pooler
/// weights feed `cls` to the classifier directly.
#[derive(Clone)]
pub struct BertClassifier(Arc<ClassifierInner>);

impl BertClassifier {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let (vb, config) = load_var_builder(model_dir.as_ref(), device)?;
        let (bert, prefix) = load_bert(&vb, &config)?;

        let pooler_vb = match prefix {
            Some(prefix) => vb.pp(prefix).pp("pooler").pp("dense"),
            None => vb.pp("pooler").pp("dense"),
        };
        let pooler = if pooler_vb.contains_tensor("weight") {
            Some(candle_nn::linear(
                config.hidden_size,
                config.hidden_size,
                pooler_vb,
            )?)
        } else {
            None
        };
        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;

        Ok(Self(Arc::new(ClassifierInner {
            bert,
            pooler,
            classifier,
        })))
    }

    /// Returns `true` if the checkpoint carried `pooler.dense` weights.
    pub fn has_pooler(&self) -> bool {
        self.0.pooler.is_some()
    }

    /// Returns `[batch, 1]` logits.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let output = self
            .0
            .bert
            .forward(input_ids, token_type_ids, attention_mask)?;
        let cls_token = output.i((.., 0, ..))?;
        let pooled = match &self.0.pooler {
            Some(pooler) => pooler.forward(&cls_token)?.tanh()?,
            None => cls_token,
        };
        self.0.classifier.forward(&pooled)
    }
}

/// Bi-encoder: BERT with masked mean pooling over the last hidden state.
#[derive(Clone)]
pub struct BertEncoder {
    bert: Arc<BertModel>,
    hidden_size: usize,
}

impl BertEncoder {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let (vb, config) = load_var_builder(model_dir.as_ref(), device)?;
        let (bert, _) = load_bert(&vb, &config)?;

        Ok(Self {
            bert: Arc::new(bert),
            hidden_size: config.hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Returns `[batch, hidden]` mean-pooled (not yet normalized) sentence embeddings.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden = self
            .bert
            .forward(input_ids, token_type_ids, Some(attention_mask))?;

        let mask = attention_mask.to_dtype(DType::F32)?;
        let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
        let counts = mask.sum_keepdim(1)?;
        summed.broadcast_div(&counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HIDDEN: usize = 4;
    const CLASSIFIER_BIAS: f32 = 0.25;

    /// Writes a zero-layer BERT checkpoint whose `[CLS]` hidden state is all zeros.
    fn write_checkpoint(dir: &Path, with_pooler: bool) {
        let config = serde_json::json!({
            "vocab_size": 8,
            "hidden_size": HIDDEN,
            "num_hidden_layers": 0,
            "num_attention_heads": 1,
            "intermediate_size": HIDDEN,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0,
            "max_position_embeddings": 8,
            "type_vocab_size": 2,
            "initializer_range": 0.02,
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0
        });
        std::fs::write(dir.join("config.json"), config.to_string()).unwrap();

        let dev = Device::Cpu;
        let mut tensors: HashMap<String, Tensor> = HashMap::new();
        for (name, rows) in [
            ("word_embeddings", 8),
            ("position_embeddings", 8),
            ("token_type_embeddings", 2),
        ] {
            tensors.insert(
                format!("bert.embeddings.{name}.weight"),
                Tensor::zeros((rows, HIDDEN), DType::F32, &dev).unwrap(),
            );
        }
        tensors.insert(
            "bert.embeddings.LayerNorm.weight".to_string(),
            Tensor::ones(HIDDEN, DType::F32, &dev).unwrap(),
        );
        tensors.insert(
            "bert.embeddings.LayerNorm.bias".to_string(),
            Tensor::zeros(HIDDEN, DType::F32, &dev).unwrap(),
        );
        if with_pooler {
            tensors.insert(
                "bert.pooler.dense.weight".to_string(),
                Tensor::zeros((HIDDEN, HIDDEN), DType::F32, &dev).unwrap(),
            );
            tensors.insert(
                "bert.pooler.dense.bias".to_string(),
                Tensor::full(0.5f32, HIDDEN, &dev).unwrap(),
            );
        }
        tensors.insert(
            "classifier.weight".to_string(),
            Tensor::ones((1, HIDDEN), DType::F32, &dev).unwrap(),
        );
        tensors.insert(
            "classifier.bias".to_string(),
            Tensor::full(CLASSIFIER_BIAS, 1, &dev).unwrap(),
        );
        candle::safetensors::save(&tensors, dir.join("model.safetensors")).unwrap();
    }

    fn single_logit(model: &BertClassifier) -> f32 {
        let dev = Device::Cpu;
        let input_ids = Tensor::new(&[[1u32, 2, 3]], &dev).unwrap();
        let token_type_ids = input_ids.zeros_like().unwrap();
        let logits = model.forward(&input_ids, &token_type_ids, None).unwrap();
        assert_eq!(logits.dims(), &[1, 1]);
        logits.flatten_all().unwrap().to_vec1::<f32>().unwrap()[0]
    }

    #[test]
    fn test_classifier_applies_pooler_and_tanh() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_checkpoint(dir.path(), true);

        let model = BertClassifier::load(dir.path(), &Device::Cpu).unwrap();
        assert!(model.has_pooler());

        // cls = 0, pooler = tanh(0 * W + 0.5), classifier = sum(pooled) + bias
        let expected = HIDDEN as f32 * 0.5f32.tanh() + CLASSIFIER_BIAS;
        assert!((single_logit(&model) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_classifier_without_pooler_weights() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_checkpoint(dir.path(), false);

        let model = BertClassifier::load(dir.path(), &Device::Cpu).unwrap();
        assert!(!model.has_pooler());
        assert!((single_logit(&model) - CLASSIFIER_BIAS).abs() < 1e-4);
    }

    #[test]
    fn test_encoder_hidden_size_from_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_checkpoint(dir.path(), true);

        let encoder = BertEncoder::load(dir.path(), &Device::Cpu).unwrap();
        assert_eq!(encoder.hidden_size(), HIDDEN);
    }
}
