use std::path::PathBuf;

use hf_hub::api::sync::ApiBuilder;
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};

/// Sampling defaults shipped with a checkpoint in `generation_config.json`.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u64>,
    pub min_p: Option<f64>,
    pub repeat_penalty: Option<f32>,
    pub repeat_last_n: Option<usize>,
    pub eos_token_ids: Vec<u64>,
}

/// A single file in a HuggingFace Hub model repository.
#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    /// Resolve the file to a local path, downloading it on first use.
    pub fn load(&self) -> Result<PathBuf> {
        let api = ApiBuilder::new().with_progress(false).build().map_err(|e| {
            PipelineError::Download(format!("Failed to initialize HuggingFace API: {e}"))
        })?;

        tracing::debug!(repo = %self.repo, file = %self.filename, "resolving hub file");

        api.model(self.repo.clone())
            .get(&self.filename)
            .map_err(|e| {
                PipelineError::Download(format!(
                    "Failed to download '{}' from '{}': {}",
                    self.filename, self.repo, e
                ))
            })
    }
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            tokenizer_file_loader: HfLoader::new(repo, filename),
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let tokenizer_file_path = self.tokenizer_file_loader.load()?;

        Tokenizer::from_file(&tokenizer_file_path).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Failed to load tokenizer from '{}': {}",
                tokenizer_file_path.display(),
                e
            ))
        })
    }
}

pub struct GenerationConfigLoader {
    pub generation_config_file_loader: HfLoader,
}

#[derive(Deserialize)]
struct RawGenerationConfig {
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<u64>,
    min_p: Option<f64>,
    #[serde(alias = "repetition_penalty")]
    repeat_penalty: Option<f32>,
    repeat_last_n: Option<usize>,
    #[serde(alias = "eos_token_id")]
    eos_token_ids: Option<serde_json::Value>,
}

impl GenerationConfigLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            generation_config_file_loader: HfLoader::new(repo, filename),
        }
    }

    pub fn load(&self) -> Result<GenerationConfig> {
        let path = self.generation_config_file_loader.load()?;
        let content = std::fs::read_to_string(path)?;
        parse_generation_config(&content)
    }
}

pub(crate) fn parse_generation_config(content: &str) -> Result<GenerationConfig> {
    let raw: RawGenerationConfig = serde_json::from_str(content)?;

    let eos_token_ids = match raw.eos_token_ids {
        Some(serde_json::Value::Number(n)) => {
            vec![n.as_u64().ok_or_else(|| {
                PipelineError::Unexpected(format!(
                    "Invalid eos_token_id: expected unsigned integer, got {n}"
                ))
            })?]
        }
        Some(serde_json::Value::Array(arr)) => arr
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_u64().ok_or_else(|| {
                    PipelineError::Unexpected(format!(
                        "Invalid eos_token_ids[{i}]: expected unsigned integer, got {v}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(GenerationConfig {
        temperature: raw.temperature,
        top_p: raw.top_p,
        top_k: raw.top_k,
        min_p: raw.min_p,
        repeat_penalty: raw.repeat_penalty,
        repeat_last_n: raw.repeat_last_n,
        eos_token_ids,
    })
}

#[derive(Debug, Clone)]
pub struct GgufModelLoader {
    pub model_file_loader: HfLoader,
}

impl GgufModelLoader {
    pub fn new(model_repo: &str, model_filename: &str) -> Self {
        Self {
            model_file_loader: HfLoader::new(model_repo, model_filename),
        }
    }

    pub fn load(&self) -> Result<(std::fs::File, candle_core::quantized::gguf_file::Content)> {
        let model_file_path = self.model_file_loader.load()?;

        let mut file = std::fs::File::open(&model_file_path)?;
        let file_content = candle_core::quantized::gguf_file::Content::read(&mut file)
            .map_err(|e| e.with_path(model_file_path))?;

        Ok((file, file_content))
    }
}
