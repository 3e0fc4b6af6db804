use std::sync::Arc;

use super::pipeline::SentimentAnalysisPipeline;
use crate::error::Result;
use crate::models::capabilities::SentimentAnalysisModel;
use crate::pipelines::cache::{global_cache, ModelOptions};
use crate::pipelines::utils::{build_cache_key, DeviceRequest};

crate::pipelines::utils::impl_device_methods!(SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel>);

/// Builder for creating [`SentimentAnalysisPipeline`] instances.
///
/// Use [`Self::modernbert`] as the entry point.
///
/// # Examples
///
/// ```rust,no_run
/// # use sentiment_storyteller::sentiment::{SentimentAnalysisPipelineBuilder, ModernBertSize};
/// # fn main() -> sentiment_storyteller::error::Result<()> {
/// let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base)
///     .cuda(0)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub(crate) fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Cpu,
        }
    }

    /// Builds the pipeline, loading the model once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading or device initialization fails.
    pub fn build(self) -> Result<SentimentAnalysisPipeline<M>>
    where
        M: Send + Sync + 'static,
        M::Options: ModelOptions,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);

        let options = self.options.clone();
        let model: Arc<M> = global_cache().get_or_create(&key, || M::new(options, device))?;
        let tokenizer = M::get_tokenizer(self.options)?;

        Ok(SentimentAnalysisPipeline { model, tokenizer })
    }
}

impl SentimentAnalysisPipelineBuilder<super::SentimentModernBert> {
    /// Creates a builder for a ModernBERT sentiment analysis model.
    pub fn modernbert(size: crate::models::ModernBertSize) -> Self {
        Self::new(size)
    }
}
