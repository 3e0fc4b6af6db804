//! Model capability traits.
//!
//! These traits define what models can do. Pipelines use them to drive
//! inference without knowing the concrete architecture.

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use crate::error::Result;
use crate::loaders::GenerationConfig;
use crate::pipelines::cache::ModelOptions;

// ============ Core model traits ============

/// Trait for KV cache types.
pub trait ModelCache: Send {
    /// Number of positions already fed through the model.
    fn current_seq_len(&self) -> usize;
}

// ============ Sentiment Analysis ============

/// Internal sentiment result type.
#[derive(Debug, Clone)]
pub struct SentimentResult {
    /// The predicted label, as spelled by the checkpoint.
    pub label: String,
    /// Probability of the predicted label.
    pub score: f32,
}

/// Trait for sentiment analysis models.
pub trait SentimentAnalysisModel {
    /// Options type for model configuration.
    type Options: std::fmt::Debug + Clone;

    /// Create a new model instance.
    fn new(options: Self::Options, device: Device) -> Result<Self>
    where
        Self: Sized;

    /// Predict sentiment with confidence score.
    fn predict_with_score(&self, tokenizer: &Tokenizer, text: &str) -> Result<SentimentResult>;

    /// Get tokenizer for this model.
    fn get_tokenizer(options: Self::Options) -> Result<Tokenizer>;

    /// Get the device this model runs on.
    fn device(&self) -> &Device;
}

// ============ Text Generation ============

/// Core trait for causal language models.
pub trait TextGenerationModel {
    /// The KV cache type for this model.
    type Cache: ModelCache;

    /// Get the tokenizer for this model.
    fn get_tokenizer(&self) -> Result<Tokenizer>;

    /// Get all end-of-sequence token IDs.
    fn get_eos_tokens(&self) -> Vec<u32>;

    /// Get the maximum sequence length this model supports.
    fn get_max_seq_len(&self) -> usize;

    /// Sampling defaults shipped with the checkpoint.
    fn generation_config(&self) -> &GenerationConfig;

    /// Create a new empty KV cache for one generation.
    fn new_cache(&self) -> Self::Cache;

    /// Run a forward pass, returning logits for the last position.
    fn forward(&self, input: &Tensor, cache: &mut Self::Cache) -> candle_core::Result<Tensor>;
}

/// Model option enums that know how to load their model.
pub trait ModelConfig: ModelOptions + Clone + Send + Sync {
    /// The model this configuration loads.
    type Model: TextGenerationModel + Send + Sync + 'static;

    /// Download (if needed) and load the model onto `device`.
    fn build(self, device: Device) -> Result<Self::Model>;
}
