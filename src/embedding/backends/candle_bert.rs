//! Candle-based sentence-transformers embedder
//!
//! Loads a BERT checkpoint (config, safetensors weights and tokenizer) from the
//! Hugging Face hub cache and produces mean-pooled, normalized sentence
//! embeddings on the CPU.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::{Tokenizer, TruncationParams};

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};

/// Local BERT embedder
pub struct CandleBertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    hidden_size: usize,
}

impl CandleBertEmbedder {
    /// Download (or reuse the cached copy of) `config.model_name` and load it
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_id = config.model_name.clone();
        tracing::info!("Loading embedding model: {}", model_id);

        let api = Api::new().context("Failed to initialize HuggingFace Hub API")?;
        let repo = api.model(model_id.clone());
        let config_path = repo.get("config.json").context("Failed to download config.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model.safetensors")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?;

        let bert_config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).context("Failed to read config.json")?,
        )
        .context("Failed to parse BERT config")?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to set truncation: {}", e))?;
        tokenizer.with_padding(None);

        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .context("Failed to load safetensors weights")?
        };
        let model = BertModel::load(vb, &bert_config)
            .context("Failed to initialize BERT model from weights")?;

        tracing::info!(
            "Embedding model loaded: {} layers, dim={}",
            bert_config.num_hidden_layers,
            bert_config.hidden_size
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id,
            hidden_size: bert_config.hidden_size,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Embedding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self.model.forward(&input_ids, &type_ids, Some(&mask))?;
        let pooled = mean_pool(&hidden, &mask)?;

        let mut embedding: Embedding = pooled.squeeze(0)?.to_vec1()?;
        normalize_embedding(&mut embedding);
        Ok(embedding)
    }
}

/// Mean pooling over non-padding tokens
fn mean_pool(hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask.unsqueeze(2)?.to_dtype(DType::F32)?;
    let sum = hidden_states.broadcast_mul(&mask)?.sum(1)?;
    let count = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(sum.broadcast_div(&count)?)
}

impl Embedder for CandleBertEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_one(text)
    }

    // Texts run one at a time so padding never changes a vector
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.hidden_size
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
