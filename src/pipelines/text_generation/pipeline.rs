use std::sync::Arc;

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use super::params::{apply_repeat_penalty, initialize_logits_processor, GenerationParams};
use crate::error::{PipelineError, Result};
use crate::models::capabilities::{ModelCache, TextGenerationModel};
use crate::pipelines::stats::GenerationStats;

/// Output from [`TextGenerationPipeline::run`].
#[derive(Debug, Clone)]
pub struct Output {
    /// The prompt followed by the generated continuation.
    pub text: String,
    /// Generation statistics.
    pub stats: GenerationStats,
}

/// Completes raw prompts with a causal language model.
///
/// The output always starts with the prompt itself, like a plain
/// text-generation pipeline: callers see exactly what the model continued.
///
/// Construct with [`TextGenerationPipelineBuilder`](super::TextGenerationPipelineBuilder).
pub struct TextGenerationPipeline<M: TextGenerationModel> {
    model: Arc<M>,
    tokenizer: Tokenizer,
    params: GenerationParams,
    device: Device,
}

impl<M: TextGenerationModel> TextGenerationPipeline<M> {
    pub(crate) fn new(model: Arc<M>, params: GenerationParams, device: Device) -> Result<Self> {
        let tokenizer = model.get_tokenizer()?;
        Ok(Self {
            model,
            tokenizer,
            params,
            device,
        })
    }

    /// Parameters resolved at build time.
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Complete `prompt` with the parameters chosen at build time.
    pub fn run(&self, prompt: &str) -> Result<Output> {
        self.run_with(prompt, &self.params)
    }

    /// Complete `prompt` with per-call parameters.
    ///
    /// `params.max_len` bounds prompt plus continuation. When the prompt
    /// already fills it, the prompt is returned unchanged.
    pub fn run_with(&self, prompt: &str, params: &GenerationParams) -> Result<Output> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &prompt.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        let prompt_tokens = encoding.get_ids();

        let mut stats = GenerationStats::new();
        stats.set_prompt_tokens(prompt_tokens.len());

        let budget = params
            .new_token_budget(prompt_tokens.len())
            .min(self.model.get_max_seq_len().saturating_sub(prompt_tokens.len()));
        let _span = tracing::debug_span!(
            "generate",
            prompt_tokens = prompt_tokens.len(),
            budget,
            temperature = params.temperature
        )
        .entered();

        if budget == 0 {
            tracing::warn!(
                prompt_tokens = prompt_tokens.len(),
                max_len = params.max_len,
                "prompt already fills max length, nothing generated"
            );
            stats.finalize();
            return Ok(Output {
                text: prompt.to_string(),
                stats,
            });
        }

        let generated = self.sample_tokens(prompt_tokens, budget, params, &mut stats)?;

        let continuation = self.tokenizer.decode(&generated, true).map_err(|e| {
            PipelineError::Tokenization(format!("Failed to decode generated tokens: {e}"))
        })?;

        stats.finalize();
        tracing::debug!(
            tokens = stats.tokens_generated,
            tokens_per_second = stats.tokens_per_second,
            "generation finished"
        );

        Ok(Output {
            text: format!("{prompt}{continuation}"),
            stats,
        })
    }

    /// Autoregressive loop: feeds the prompt once, then one token at a time.
    /// Returns the sampled tokens with any EOS token removed.
    fn sample_tokens(
        &self,
        prompt_tokens: &[u32],
        budget: usize,
        params: &GenerationParams,
        stats: &mut GenerationStats,
    ) -> Result<Vec<u32>> {
        let eos_tokens = self.model.get_eos_tokens();
        if eos_tokens.is_empty() {
            return Err(PipelineError::Unexpected(
                "No EOS tokens configured for model. Cannot determine when to stop.".to_string(),
            ));
        }

        let mut logits_processor = initialize_logits_processor(params);
        let mut cache = self.model.new_cache();
        let mut generated: Vec<u32> = Vec::with_capacity(budget);

        let input = Tensor::new(prompt_tokens, &self.device)?.unsqueeze(0)?;
        let mut logits = self.model.forward(&input, &mut cache)?.squeeze(0)?;

        while generated.len() < budget {
            let start_at = generated.len().saturating_sub(params.repeat_last_n);
            let penalty_context = &generated[start_at..];
            if params.repeat_penalty > 1. && !penalty_context.is_empty() {
                logits = apply_repeat_penalty(&logits, params.repeat_penalty, penalty_context)?;
            }

            let next_token = logits_processor
                .sample(&logits)
                .map_err(|e| PipelineError::Generation(format!("Sampling failed: {e}")))?;
            stats.record_token();

            if eos_tokens.contains(&next_token) {
                break;
            }
            generated.push(next_token);

            if generated.len() == budget {
                break;
            }

            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            logits = self.model.forward(&input, &mut cache)?.squeeze(0)?;
        }

        tracing::trace!(positions = cache.current_seq_len(), "kv cache released");
        Ok(generated)
    }
}
