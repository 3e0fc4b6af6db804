use std::sync::Arc;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::models::quantized_qwen3 as candle_qwen3;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};
use crate::loaders::{GenerationConfig, GenerationConfigLoader, GgufModelLoader, TokenizerLoader};
use crate::models::capabilities::{ModelCache, ModelConfig, TextGenerationModel};

// All sizes share the base checkpoint's tokenizer and generation config.
const CONFIG_REPO: &str = "Qwen/Qwen3-0.6B";

/// Available Qwen 3 model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qwen3Size {
    /// 0.6 billion parameters.
    Size0_6B,
    /// 1.7 billion parameters.
    Size1_7B,
    /// 4 billion parameters.
    Size4B,
}

impl Qwen3Size {
    pub(crate) fn to_id(self) -> (&'static str, &'static str) {
        match self {
            Qwen3Size::Size0_6B => ("unsloth/Qwen3-0.6B-GGUF", "Qwen3-0.6B-Q4_K_M.gguf"),
            Qwen3Size::Size1_7B => ("unsloth/Qwen3-1.7B-GGUF", "Qwen3-1.7B-Q4_K_M.gguf"),
            Qwen3Size::Size4B => ("unsloth/Qwen3-4B-GGUF", "Qwen3-4B-Q4_K_M.gguf"),
        }
    }
}

impl std::fmt::Display for Qwen3Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Qwen3Size::Size0_6B => "qwen3-0.6b",
            Qwen3Size::Size1_7B => "qwen3-1.7b",
            Qwen3Size::Size4B => "qwen3-4b",
        };
        write!(f, "{name}")
    }
}

impl crate::pipelines::cache::ModelOptions for Qwen3Size {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl ModelConfig for Qwen3Size {
    type Model = Qwen3;

    fn build(self, device: Device) -> Result<Qwen3> {
        Qwen3::from_hf(&device, self)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ModelInfo {
    pub num_layers: usize,
    pub max_seq_len: usize,
}

/// Only for generic annotations. Use [`TextGenerationPipelineBuilder::qwen3`](crate::text_generation::TextGenerationPipelineBuilder::qwen3).
pub struct Qwen3 {
    weights: Arc<candle_qwen3::ModelWeights>,
    info: ModelInfo,
    generation_config: GenerationConfig,
}

impl Qwen3 {
    fn parse_metadata(content: &gguf_file::Content) -> Result<ModelInfo> {
        let num_layers = content
            .metadata
            .get("qwen3.block_count")
            .ok_or_else(|| {
                PipelineError::Unexpected(
                    "Missing 'qwen3.block_count' in Qwen3 model metadata".to_string(),
                )
            })?
            .to_u32()? as usize;
        let max_seq_len = content
            .metadata
            .get("qwen3.context_length")
            .ok_or_else(|| {
                PipelineError::Unexpected(
                    "Missing 'qwen3.context_length' in Qwen3 model metadata".to_string(),
                )
            })?
            .to_u32()? as usize;

        Ok(ModelInfo {
            num_layers,
            max_seq_len,
        })
    }

    pub(crate) fn from_hf(device: &Device, size: Qwen3Size) -> Result<Self> {
        let (repo_id, file_name) = size.to_id();

        let (mut file, content) = GgufModelLoader::new(repo_id, file_name).load()?;
        let generation_config =
            GenerationConfigLoader::new(CONFIG_REPO, "generation_config.json").load()?;

        let info = Self::parse_metadata(&content)?;
        tracing::debug!(
            model = %size,
            layers = info.num_layers,
            context = info.max_seq_len,
            "loading qwen3 weights"
        );

        let weights = Arc::new(candle_qwen3::ModelWeights::from_gguf(
            content, &mut file, device,
        )?);

        Ok(Self {
            weights,
            info,
            generation_config,
        })
    }
}

/// Per-generation state: a private copy of the weights' KV cache plus the
/// number of positions already fed.
pub struct Qwen3Cache {
    weights: candle_qwen3::ModelWeights,
    position: usize,
}

impl ModelCache for Qwen3Cache {
    fn current_seq_len(&self) -> usize {
        self.position
    }
}

impl TextGenerationModel for Qwen3 {
    type Cache = Qwen3Cache;

    fn get_tokenizer(&self) -> Result<Tokenizer> {
        TokenizerLoader::new(CONFIG_REPO, "tokenizer.json").load()
    }

    fn get_eos_tokens(&self) -> Vec<u32> {
        self.generation_config
            .eos_token_ids
            .iter()
            .map(|&id| id as u32)
            .collect()
    }

    fn get_max_seq_len(&self) -> usize {
        self.info.max_seq_len
    }

    fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    fn new_cache(&self) -> Qwen3Cache {
        let mut weights = (*self.weights).clone();
        weights.clear_kv_cache();
        Qwen3Cache {
            weights,
            position: 0,
        }
    }

    fn forward(&self, input: &Tensor, cache: &mut Qwen3Cache) -> candle_core::Result<Tensor> {
        let seq_len = input.dim(1)?;
        let logits = cache.weights.forward(input, cache.position)?;
        cache.position += seq_len;
        Ok(logits)
    }
}
