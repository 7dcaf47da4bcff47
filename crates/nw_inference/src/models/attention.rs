//! Variant B: sequence model with learned additive attention, run through
//! candle on CPU. Two artifacts: a word-index tokenizer (JSON) and the
//! network weights (safetensors). The network emits the distribution
//! directly in `(pos, neg, neu)` order.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use candle_core::{Device, Tensor, D};
use candle_nn::ops::softmax;
use serde::Deserialize;

use nw_core::{Error, Result, Sentiment};

use super::SentimentModel;
use crate::text;

/// Keras-style word-index tokenizer: index 0 is padding, unknown words map
/// to `oov_index` when present and are skipped otherwise.
#[derive(Debug, Deserialize)]
struct TokenizerArtifact {
    word_index: HashMap<String, u32>,
    #[serde(default)]
    oov_index: Option<u32>,
    max_len: usize,
}

pub struct AttentionModel {
    tokenizer: TokenizerArtifact,
    vocab_size: usize,
    embedding: Tensor,
    attn_w: Tensor,
    attn_b: Tensor,
    attn_v: Tensor,
    dense_w: Tensor,
    dense_b: Tensor,
    device: Device,
}

impl fmt::Debug for AttentionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttentionModel")
            .field("vocab_size", &self.vocab_size)
            .field("max_len", &self.tokenizer.max_len)
            .finish()
    }
}

fn contract_err(e: candle_core::Error) -> Error {
    Error::BackendContract(format!("model forward pass failed: {e}"))
}

impl AttentionModel {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        for path in [model_path, tokenizer_path] {
            if !path.exists() {
                return Err(Error::ModelUnavailable(format!(
                    "model artifact not found: {}",
                    path.display()
                )));
            }
        }

        let file = File::open(tokenizer_path)
            .map_err(|e| Error::ModelUnavailable(format!("failed to open tokenizer: {e}")))?;
        let tokenizer: TokenizerArtifact = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ModelUnavailable(format!("malformed tokenizer artifact: {e}")))?;
        if tokenizer.max_len == 0 {
            return Err(Error::BackendContract(
                "tokenizer max_len must be positive".to_string(),
            ));
        }

        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(model_path, &device)
            .map_err(|e| Error::ModelUnavailable(format!("failed to read model weights: {e}")))?;
        let take = |name: &str| -> Result<Tensor> {
            tensors
                .get(name)
                .cloned()
                .ok_or_else(|| Error::BackendContract(format!("missing tensor '{name}'")))
        };

        let embedding = take("embedding.weight")?;
        let attn_w = take("attention.weight")?;
        let attn_b = take("attention.bias")?;
        let attn_v = take("attention.context")?;
        let dense_w = take("classifier.weight")?;
        let dense_b = take("classifier.bias")?;

        let (vocab_size, dim) = embedding
            .dims2()
            .map_err(|_| Error::BackendContract("embedding must be 2-dimensional".to_string()))?;
        let shape_err = |what: &str| Error::BackendContract(format!("unexpected shape for {what}"));
        if attn_w.dims() != [dim, dim] {
            return Err(shape_err("attention.weight"));
        }
        if attn_b.dims() != [dim] {
            return Err(shape_err("attention.bias"));
        }
        if attn_v.dims() != [dim] {
            return Err(shape_err("attention.context"));
        }
        if dense_w.dims() != [3, dim] {
            return Err(shape_err("classifier.weight"));
        }
        if dense_b.dims() != [3] {
            return Err(shape_err("classifier.bias"));
        }
        // Column vector form for the score projection.
        let attn_v = attn_v
            .reshape((dim, 1))
            .map_err(|_| shape_err("attention.context"))?;

        Ok(Self {
            tokenizer,
            vocab_size,
            embedding,
            attn_w,
            attn_b,
            attn_v,
            dense_w,
            dense_b,
            device,
        })
    }

    /// Text -> fixed-length integer sequence, truncated/zero-padded to
    /// `max_len`.
    fn encode(&self, processed: &str) -> Vec<u32> {
        let mut ids: Vec<u32> = processed
            .split_whitespace()
            .filter_map(|word| {
                self.tokenizer
                    .word_index
                    .get(word)
                    .copied()
                    .or(self.tokenizer.oov_index)
            })
            .filter(|&idx| (idx as usize) < self.vocab_size)
            .take(self.tokenizer.max_len)
            .collect();
        ids.resize(self.tokenizer.max_len, 0);
        ids
    }

    fn forward(&self, ids: Vec<u32>) -> candle_core::Result<Vec<f32>> {
        let ids = Tensor::from_vec(ids, (self.tokenizer.max_len,), &self.device)?;
        let hidden = self.embedding.index_select(&ids, 0)?; // [len, dim]
        let scores = hidden
            .matmul(&self.attn_w)?
            .broadcast_add(&self.attn_b)?
            .tanh()?
            .matmul(&self.attn_v)?; // [len, 1]
        let weights = softmax(&scores, 0)?;
        let context = weights.t()?.matmul(&hidden)?; // [1, dim]
        let logits = context
            .matmul(&self.dense_w.t()?)?
            .broadcast_add(&self.dense_b)?; // [1, 3]
        softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()
    }
}

#[async_trait]
impl SentimentModel for AttentionModel {
    fn name(&self) -> &str {
        "attention"
    }

    async fn classify(&self, text: &str) -> Result<Sentiment> {
        let processed = text::normalize(text);
        let ids = self.encode(&processed);
        let proba = self.forward(ids).map_err(contract_err)?;
        if proba.len() != 3 {
            return Err(Error::BackendContract(format!(
                "expected a 3-way distribution, got {} entries",
                proba.len()
            )));
        }
        Ok(Sentiment {
            pos: proba[0],
            neg: proba[1],
            neu: proba[2],
        }
        .renormalized())
    }
}
