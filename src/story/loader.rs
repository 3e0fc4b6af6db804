use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;

use super::settings::{DEFAULT_MAX_LENGTH, DEFAULT_TEMPERATURE};
use super::storyteller::{SentimentClassifier, Storyteller, TextGenerator};
use crate::error::Result;
use crate::models::capabilities::ModelConfig;
use crate::models::{Llama3_2Size, ModernBertSize, Qwen3Size};
use crate::pipelines::cache::global_cache;
use crate::pipelines::utils::DeviceRequest;
use crate::sentiment::SentimentAnalysisPipelineBuilder;
use crate::text_generation::TextGenerationPipelineBuilder;

/// Which causal LM writes the stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorModel {
    /// Quantized Qwen 3.
    Qwen3(Qwen3Size),
    /// Quantized Llama 3.2.
    Llama3_2(Llama3_2Size),
}

impl Default for GeneratorModel {
    fn default() -> Self {
        GeneratorModel::Qwen3(Qwen3Size::Size0_6B)
    }
}

impl fmt::Display for GeneratorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorModel::Qwen3(size) => size.fmt(f),
            GeneratorModel::Llama3_2(size) => size.fmt(f),
        }
    }
}

/// Everything needed to load the two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Sentiment classifier checkpoint.
    pub sentiment: ModernBertSize,
    /// Story generator checkpoint.
    pub generator: GeneratorModel,
    /// Device both models run on.
    pub device: DeviceRequest,
    /// Fixed sampling seed. `None` samples with a fresh seed per story.
    pub seed: Option<u64>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            sentiment: ModernBertSize::Base,
            generator: GeneratorModel::default(),
            device: DeviceRequest::Cpu,
            seed: None,
        }
    }
}

/// The loaded classifier and generator.
pub struct LoadedModels {
    /// Loaded sentiment classifier.
    pub classifier: Arc<dyn SentimentClassifier>,
    /// Loaded story generator.
    pub generator: Arc<dyn TextGenerator>,
    spec: ModelSpec,
}

impl LoadedModels {
    /// The spec these models were loaded from.
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// A storyteller backed by these models.
    pub fn storyteller(&self) -> Storyteller {
        Storyteller::new(self.classifier.clone(), self.generator.clone())
    }
}

/// A value that is loaded at most once and then shared.
///
/// A failed load leaves the cell empty and returns the error; nothing is
/// retried on the caller's behalf.
pub struct LoadOnce<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> LoadOnce<T> {
    /// An empty cell.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the loaded value, running `load` if nothing is loaded yet.
    ///
    /// Concurrent first callers block until one of them finishes loading.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        self.cell
            .get_or_try_init(|| load().map(Arc::new))
            .map(Arc::clone)
    }

    /// The loaded value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T> Default for LoadOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

static MODELS: LoadOnce<LoadedModels> = LoadOnce::new();

/// Load the classifier and generator for this process.
///
/// The first successful call downloads (if needed) and loads both models;
/// later calls return the same handles. The models are never reloaded, so a
/// later call with a different spec still gets the first models.
pub fn load_models(spec: &ModelSpec) -> Result<Arc<LoadedModels>> {
    let models = MODELS.get_or_load(|| load_uncached(spec))?;
    if models.spec() != spec {
        tracing::warn!(
            loaded = ?models.spec(),
            requested = ?spec,
            "models already loaded, ignoring new spec"
        );
    }
    Ok(models)
}

fn load_uncached(spec: &ModelSpec) -> Result<LoadedModels> {
    let _span = tracing::info_span!(
        "load_models",
        sentiment = %spec.sentiment,
        generator = %spec.generator,
        device = ?spec.device
    )
    .entered();
    let started = Instant::now();

    let classifier = SentimentAnalysisPipelineBuilder::modernbert(spec.sentiment)
        .device(spec.device)
        .build()?;

    let generator: Arc<dyn TextGenerator> = match spec.generator {
        GeneratorModel::Qwen3(size) => {
            Arc::new(configure(TextGenerationPipelineBuilder::qwen3(size), spec).build()?)
        }
        GeneratorModel::Llama3_2(size) => {
            Arc::new(configure(TextGenerationPipelineBuilder::llama3_2(size), spec).build()?)
        }
    };

    let cache = global_cache();
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        cached_models = cache.len(),
        loader_runs = cache.loads(),
        "models ready"
    );

    Ok(LoadedModels {
        classifier: Arc::new(classifier),
        generator,
        spec: *spec,
    })
}

// Per-story settings replace max_len and temperature on every call.
fn configure<C: ModelConfig>(
    builder: TextGenerationPipelineBuilder<C>,
    spec: &ModelSpec,
) -> TextGenerationPipelineBuilder<C> {
    let builder = builder
        .device(spec.device)
        .temperature(DEFAULT_TEMPERATURE)
        .max_len(DEFAULT_MAX_LENGTH);
    match spec.seed {
        Some(seed) => builder.seed(seed),
        None => builder,
    }
}
