//! Local sentence encoder on Candle.
//!
//! Runs a BERT-family sentence-transformer (all-MiniLM-L6-v2 by default) on
//! the CPU. Token states are mean-pooled over real tokens and scaled to unit
//! length, so cosine similarity reduces to a dot product downstream.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use rag_types::EmbeddingVector;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::adapter::{embed, IntoEmbeddingVector};
use crate::cache::{ModelCache, ModelPaths};
use crate::error::EmbeddingError;
use crate::model::{EmbeddingModel, ModelInfo};

/// Token limit the sentence-transformers pooling config uses for MiniLM.
pub const MAX_SEQ_LENGTH: usize = 256;

/// The two sizes the embedder needs from `config.json`.
#[derive(Debug, Deserialize)]
struct EncoderShape {
    hidden_size: usize,
    max_position_embeddings: usize,
}

/// The adapter flattens tensors through their list conversion.
impl IntoEmbeddingVector for Tensor {
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError> {
        let values = self.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        Ok(EmbeddingVector::new(values))
    }
}

pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the cached repository, fetching missing files first.
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = cache.resolve()?;
        let name = cache
            .repo_id
            .rsplit('/')
            .next()
            .unwrap_or(cache.repo_id.as_str());
        Self::load_from_paths(name, &paths)
    }

    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    pub fn load_from_paths(name: &str, paths: &ModelPaths) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&paths.config)?;
        let shape: EncoderShape = serde_json::from_str(&raw_config)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("{}: {}", paths.config.display(), e)))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("{}: {}", paths.config.display(), e)))?;

        let tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let weights = load_weights(&paths.weights, &device)?;
        let model = BertModel::load(weights, &config)?;

        let info = ModelInfo {
            name: name.to_string(),
            dimension: shape.hidden_size,
            max_sequence_length: shape.max_position_embeddings.min(MAX_SEQ_LENGTH),
        };
        info!(
            model = %info.name,
            dim = info.dimension,
            max_seq = info.max_sequence_length,
            "Embedding model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            info,
        })
    }

    /// Token ids and attention mask, `(batch, len)`, padded to the longest
    /// text and cut at the model's sequence limit.
    fn tokenize(&self, texts: &[&str]) -> Result<(Tensor, Tensor), EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.info.max_sequence_length);

        let mut ids = vec![0u32; texts.len() * len];
        let mut mask = vec![0u32; texts.len() * len];
        for (row, encoding) in encodings.iter().enumerate() {
            let take = encoding.get_ids().len().min(len);
            let start = row * len;
            ids[start..start + take].copy_from_slice(&encoding.get_ids()[..take]);
            mask[start..start + take].copy_from_slice(&encoding.get_attention_mask()[..take]);
        }

        let shape = (texts.len(), len);
        Ok((
            Tensor::from_vec(ids, shape, &self.device)?,
            Tensor::from_vec(mask, shape, &self.device)?,
        ))
    }

    /// `(batch, dim)` unit-length sentence embeddings.
    fn encode(&self, texts: &[&str]) -> Result<Tensor, EmbeddingError> {
        let (ids, mask) = self.tokenize(texts)?;
        debug!(batch = texts.len(), tokens = ids.dim(1)?, "Encoding");

        let token_types = ids.zeros_like()?;
        let hidden = self.model.forward(&ids, &token_types, Some(&mask))?;
        normalize_rows(&mean_pool(&hidden, &mask)?)
    }
}

fn load_weights(path: &Path, device: &Device) -> Result<VarBuilder<'static>, EmbeddingError> {
    // SAFETY: the weights file is not modified while the model is alive.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };
    Ok(vb)
}

/// Average of token states where `mask` is 1.
fn mean_pool(hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = mask
        .to_dtype(DType::F32)?
        .unsqueeze(2)?
        .broadcast_as(hidden.shape())?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&counts)?)
}

fn normalize_rows(rows: &Tensor) -> Result<Tensor, EmbeddingError> {
    let norms = rows.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
    Ok(rows.broadcast_div(&norms)?)
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        embed(|t| Ok(self.encode(&[t])?.get(0)?), text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.encode(texts)?.to_vec2::<f32>()?;
        debug!(count = rows.len(), "Batch embedded");
        Ok(rows.into_iter().map(EmbeddingVector::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_flattens_into_vector() {
        let tensor = Tensor::new(&[[0.6f32, 0.8f32]], &Device::Cpu).unwrap();
        let vector = tensor.into_embedding_vector().unwrap();
        assert_eq!(vector.as_slice(), &[0.6, 0.8]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // one row, three tokens, the last one padding
        let hidden = Tensor::new(&[[[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_normalize_rows_unit_length() {
        let rows = Tensor::new(&[[3.0f32, 4.0], [0.0, 2.0]], &Device::Cpu).unwrap();
        let unit = normalize_rows(&rows).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(unit, vec![vec![0.6, 0.8], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_encoder_shape_reads_bert_config() {
        let shape: EncoderShape = serde_json::from_str(
            r#"{"hidden_size": 384, "max_position_embeddings": 512, "num_hidden_layers": 6}"#,
        )
        .unwrap();
        assert_eq!(shape.hidden_size, 384);
        assert_eq!(shape.max_position_embeddings.min(MAX_SEQ_LENGTH), 256);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_default_model_is_unit_length_384() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert_eq!(embedder.info().name, "all-MiniLM-L6-v2");
        let emb = embedder.embed("What is a transformer model?").unwrap();
        assert_eq!(emb.dimension(), 384);
        let norm: f32 = emb.as_slice().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_batch_matches_single() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let texts = ["What is NLP?", "Explain self-attention in transformers"];
        let batch = embedder.embed_batch(&texts).unwrap();
        let single = embedder.embed(texts[0]).unwrap();
        assert_eq!(batch.len(), 2);
        for (a, b) in batch[0].as_slice().iter().zip(single.as_slice()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
