//! Sentence embeddings from a BERT-family encoder running on candle.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use tokenizers::Tokenizer;

use semdex_core::error::Error;
use semdex_core::traits::Embedder;

use crate::device::select_device;
use crate::model::{resolve_model_files, WeightsFile};
use crate::pool::masked_mean_l2;
use crate::tokenize::{prepare_tokenizer, tokenize_batch};

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dim: usize,
}

impl BertEmbedder {
    pub fn load(model_name: &str) -> Result<Self> {
        let files = resolve_model_files(model_name)?;
        let device = select_device();

        tracing::debug!("Loading tokenizer from {}", files.tokenizer.display());
        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", files.tokenizer.display(), e))?;
        prepare_tokenizer(&mut tokenizer)?;

        tracing::debug!("Loading model config from {}", files.config.display());
        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("Failed to read {}", files.config.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let vb = match &files.weights {
            WeightsFile::SafeTensors(path) => {
                tracing::debug!("Loading safetensors weights from {}", path.display());
                // SAFETY: the weights file is memory-mapped read-only and not modified while mapped.
                unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)? }
            }
            WeightsFile::Pickle(path) => {
                tracing::debug!("Loading pickle weights from {}", path.display());
                let weights: HashMap<String, candle_core::Tensor> =
                    candle_core::pickle::read_all(path)?.into_iter().collect();
                VarBuilder::from_tensors(weights, DType::F32, &device)
            }
        };
        let model = BertModel::load(vb, &config)?;
        tracing::info!("Loaded model {} (dim={})", model_name, dim);
        Ok(Self { model, tokenizer, device, model_name: model_name.to_string(), dim })
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (input_ids, token_type_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for BertEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> semdex_core::Result<Vec<Vec<f32>>> {
        self.encode(texts).map_err(|e| Error::Embedding(format!("{e:#}")))
    }
}
