use std::io;
use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer, TruncationParams};

/// Loads `tokenizer.json` from a model directory (or an explicit tokenizer file path) with
/// truncation at `max_len` tokens.
pub fn load_tokenizer(model_path: &Path, max_len: usize) -> io::Result<Tokenizer> {
    let tokenizer_path = if model_path.is_dir() {
        model_path.join("tokenizer.json")
    } else {
        model_path.to_path_buf()
    };

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(io::Error::other)?;

    let truncation = TruncationParams {
        max_length: max_len,
        ..Default::default()
    };
    tokenizer
        .with_truncation(Some(truncation))
        .map_err(|e| io::Error::other(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

/// Right-pads a batch of encodings into `[batch, seq_len]` tensors:
/// `(input_ids, token_type_ids, attention_mask)`.
///
/// Padded positions carry id 0 and mask 0, so they never contribute to attention or pooling.
pub fn batch_tensors(
    encodings: &[Encoding],
    device: &Device,
) -> candle_core::Result<(Tensor, Tensor, Tensor)> {
    let batch = encodings.len();
    let seq_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut type_ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);

    for encoding in encodings {
        let len = encoding.get_ids().len();
        ids.extend_from_slice(encoding.get_ids());
        type_ids.extend_from_slice(encoding.get_type_ids());
        mask.extend_from_slice(encoding.get_attention_mask());

        let pad = seq_len - len;
        ids.extend(std::iter::repeat_n(0u32, pad));
        type_ids.extend(std::iter::repeat_n(0u32, pad));
        mask.extend(std::iter::repeat_n(0u32, pad));
    }

    let shape = (batch, seq_len);
    Ok((
        Tensor::from_vec(ids, shape, device)?,
        Tensor::from_vec(type_ids, shape, device)?,
        Tensor::from_vec(mask, shape, device)?,
    ))
}

/// Scales `v` to unit L2 norm in place; a zero vector is left untouched.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Dot product over the shared prefix of `a` and `b`. For unit vectors this is the
/// cosine similarity.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
