use std::sync::Arc;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::models::quantized_llama as candle_llama;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};
use crate::loaders::{GenerationConfig, GenerationConfigLoader, GgufModelLoader, TokenizerLoader};
use crate::models::capabilities::{ModelCache, ModelConfig, TextGenerationModel};

/// Llama 3.2 model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Llama3_2Size {
    /// 1 billion parameters.
    Size1B,
    /// 3 billion parameters.
    Size3B,
}

impl Llama3_2Size {
    pub(crate) fn weight_repo_id(&self) -> &'static str {
        match self {
            Llama3_2Size::Size1B => "unsloth/Llama-3.2-1B-Instruct-GGUF",
            Llama3_2Size::Size3B => "unsloth/Llama-3.2-3B-Instruct-GGUF",
        }
    }

    pub(crate) fn weight_filename(&self) -> &'static str {
        match self {
            Llama3_2Size::Size1B => "Llama-3.2-1B-Instruct-Q4_K_M.gguf",
            Llama3_2Size::Size3B => "Llama-3.2-3B-Instruct-Q4_K_M.gguf",
        }
    }

    // The meta-llama originals are gated; the unsloth mirrors carry the same files.
    pub(crate) fn config_repo_id(&self) -> &'static str {
        match self {
            Llama3_2Size::Size1B => "unsloth/Llama-3.2-1B-Instruct",
            Llama3_2Size::Size3B => "unsloth/Llama-3.2-3B-Instruct",
        }
    }
}

impl std::fmt::Display for Llama3_2Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Llama3_2Size::Size1B => "llama3.2-1b",
            Llama3_2Size::Size3B => "llama3.2-3b",
        };
        write!(f, "{name}")
    }
}

impl crate::pipelines::cache::ModelOptions for Llama3_2Size {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl ModelConfig for Llama3_2Size {
    type Model = Llama3_2;

    fn build(self, device: Device) -> Result<Llama3_2> {
        Llama3_2::from_hf(&device, self)
    }
}

/// Only for generic annotations. Use [`TextGenerationPipelineBuilder::llama3_2`](crate::text_generation::TextGenerationPipelineBuilder::llama3_2).
pub struct Llama3_2 {
    weights: Arc<candle_llama::ModelWeights>,
    max_seq_len: usize,
    tokenizer_repo_id: &'static str,
    generation_config: GenerationConfig,
}

impl Llama3_2 {
    fn parse_metadata(content: &gguf_file::Content) -> Result<usize> {
        let num_layers = content
            .metadata
            .get("llama.block_count")
            .and_then(|v| v.to_u32().ok())
            .ok_or_else(|| {
                PipelineError::Unexpected(
                    "Missing 'llama.block_count' in Llama model metadata".to_string(),
                )
            })? as usize;

        let max_seq_len = content
            .metadata
            .get("llama.context_length")
            .and_then(|v| v.to_u32().ok())
            .unwrap_or(131_072) as usize;

        tracing::debug!(layers = num_layers, context = max_seq_len, "llama metadata");
        Ok(max_seq_len)
    }

    pub(crate) fn from_hf(device: &Device, size: Llama3_2Size) -> Result<Self> {
        let (mut file, content) =
            GgufModelLoader::new(size.weight_repo_id(), size.weight_filename()).load()?;
        let generation_config =
            GenerationConfigLoader::new(size.config_repo_id(), "generation_config.json").load()?;

        let max_seq_len = Self::parse_metadata(&content)?;
        let weights = Arc::new(candle_llama::ModelWeights::from_gguf(
            content, &mut file, device,
        )?);

        Ok(Self {
            weights,
            max_seq_len,
            tokenizer_repo_id: size.config_repo_id(),
            generation_config,
        })
    }
}

/// Per-generation state. The quantized llama layers start a fresh KV cache
/// whenever they are fed position 0.
pub struct Llama3_2Cache {
    weights: candle_llama::ModelWeights,
    position: usize,
}

impl ModelCache for Llama3_2Cache {
    fn current_seq_len(&self) -> usize {
        self.position
    }
}

impl TextGenerationModel for Llama3_2 {
    type Cache = Llama3_2Cache;

    fn get_tokenizer(&self) -> Result<Tokenizer> {
        TokenizerLoader::new(self.tokenizer_repo_id, "tokenizer.json").load()
    }

    fn get_eos_tokens(&self) -> Vec<u32> {
        self.generation_config
            .eos_token_ids
            .iter()
            .map(|&id| id as u32)
            .collect()
    }

    fn get_max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    fn new_cache(&self) -> Llama3_2Cache {
        Llama3_2Cache {
            weights: (*self.weights).clone(),
            position: 0,
        }
    }

    fn forward(&self, input: &Tensor, cache: &mut Llama3_2Cache) -> candle_core::Result<Tensor> {
        let seq_len = input.dim(1)?;
        let logits = cache.weights.forward(input, cache.position)?;
        cache.position += seq_len;
        Ok(logits)
    }
}
