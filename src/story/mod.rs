//! Sentiment-steered story generation.
//!
//! [`Storyteller::submit`] classifies the prompt, turns the label into a
//! [`Tone`], formats the matching instruction, and hands it to the generator
//! with the caller's [`GenerationSettings`]. [`load_models`] loads the real
//! classifier and generator once per process.
//!
//! ```rust,no_run
//! use sentiment_storyteller::story::{load_models, GenerationSettings, ModelSpec};
//!
//! # fn main() -> sentiment_storyteller::error::Result<()> {
//! let models = load_models(&ModelSpec::default())?;
//! let settings = GenerationSettings::new(150, 0.9)?;
//! let outcome = models.storyteller().submit("A lighthouse keeper finds a letter", &settings)?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub(crate) mod loader;
pub(crate) mod settings;
pub(crate) mod storyteller;
pub(crate) mod tone;

pub use crate::models::{Llama3_2Size, ModernBertSize, Qwen3Size};
pub use loader::{load_models, GeneratorModel, LoadOnce, LoadedModels, ModelSpec};
pub use settings::{
    GenerationSettings, DEFAULT_MAX_LENGTH, DEFAULT_TEMPERATURE, MAX_LENGTH_RANGE,
    TEMPERATURE_RANGE,
};
pub use storyteller::{
    SentimentClassifier, SentimentDisplay, Story, Storyteller, Submission, TextGenerator,
    MISSING_PROMPT_WARNING,
};
pub use tone::{Tone, POSITIVE_LABEL};
