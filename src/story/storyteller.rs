use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::settings::GenerationSettings;
use super::tone::Tone;
use crate::error::Result;
use crate::models::capabilities::{SentimentAnalysisModel, TextGenerationModel};
use crate::sentiment::{Prediction, SentimentAnalysisPipeline};
use crate::text_generation::{GenerationParams, TextGenerationPipeline};

/// Warning shown when the prompt is empty after trimming.
pub const MISSING_PROMPT_WARNING: &str = "Please enter a prompt first.";

// ============ Collaborators ============

/// Anything that can label the sentiment of a text.
pub trait SentimentClassifier: Send + Sync {
    /// Classify `text`, returning the label and its confidence.
    fn classify(&self, text: &str) -> Result<Prediction>;
}

/// Anything that can complete an instruction into a story.
pub trait TextGenerator: Send + Sync {
    /// Generate exactly one sequence for `instruction`.
    ///
    /// The returned text is the raw model output, which normally begins
    /// with the instruction itself.
    fn generate(&self, instruction: &str, settings: &GenerationSettings) -> Result<String>;
}

impl<M> SentimentClassifier for SentimentAnalysisPipeline<M>
where
    M: SentimentAnalysisModel + Send + Sync,
{
    fn classify(&self, text: &str) -> Result<Prediction> {
        Ok(self.run(text)?.prediction)
    }
}

impl<M> TextGenerator for TextGenerationPipeline<M>
where
    M: TextGenerationModel + Send + Sync,
{
    fn generate(&self, instruction: &str, settings: &GenerationSettings) -> Result<String> {
        let params = story_params(self.params(), settings);
        Ok(self.run_with(instruction, &params)?.text)
    }
}

/// The build-time params with the story's max length and temperature swapped in.
pub(crate) fn story_params(base: &GenerationParams, settings: &GenerationSettings) -> GenerationParams {
    GenerationParams {
        max_len: settings.max_length(),
        temperature: settings.temperature(),
        ..base.clone()
    }
}

// ============ Results ============

/// A generated story together with how it was steered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    /// Classifier output for the prompt.
    pub sentiment: Prediction,
    /// Tone selected from the label.
    pub tone: Tone,
    /// Instruction sent to the generator.
    pub instruction: String,
    /// Raw generator output, untrimmed.
    pub text: String,
}

impl Story {
    /// Info line describing the detected sentiment.
    pub fn sentiment_display(&self) -> SentimentDisplay<'_> {
        SentimentDisplay(&self.sentiment)
    }
}

/// Outcome of one [`Storyteller::submit`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The prompt was blank. No model was called.
    MissingPrompt,
    /// A story was generated.
    Story(Story),
}

impl Submission {
    /// The user-facing warning, if the submission was rejected.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Submission::MissingPrompt => Some(MISSING_PROMPT_WARNING),
            Submission::Story(_) => None,
        }
    }
}

/// Renders `Detected Sentiment: {label} ({score} confidence)` with the score
/// at two decimals.
pub struct SentimentDisplay<'a>(&'a Prediction);

impl fmt::Display for SentimentDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detected Sentiment: {} ({:.2} confidence)",
            self.0.label, self.0.score
        )
    }
}

// ============ Orchestration ============

/// Classifies a prompt, picks a tone, and asks the generator for a story.
///
/// # Example
///
/// ```rust,no_run
/// use sentiment_storyteller::story::{load_models, GenerationSettings, ModelSpec, Submission};
///
/// # fn main() -> sentiment_storyteller::error::Result<()> {
/// let storyteller = load_models(&ModelSpec::default())?.storyteller();
///
/// match storyteller.submit("The futuristic city was silent...", &GenerationSettings::default())? {
///     Submission::Story(story) => println!("{}\n\n{}", story.sentiment_display(), story.text),
///     Submission::MissingPrompt => eprintln!("{}", sentiment_storyteller::story::MISSING_PROMPT_WARNING),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Storyteller {
    classifier: Arc<dyn SentimentClassifier>,
    generator: Arc<dyn TextGenerator>,
}

impl Storyteller {
    /// Combine a classifier and a generator.
    pub fn new(classifier: Arc<dyn SentimentClassifier>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            classifier,
            generator,
        }
    }

    /// Run the whole flow for one prompt.
    ///
    /// A blank prompt short-circuits to [`Submission::MissingPrompt`].
    /// Otherwise the classifier and the generator are each called once, and
    /// any error they return is passed through unchanged.
    pub fn submit(&self, prompt: &str, settings: &GenerationSettings) -> Result<Submission> {
        if prompt.trim().is_empty() {
            tracing::warn!("empty prompt submitted");
            return Ok(Submission::MissingPrompt);
        }

        let sentiment = self.classifier.classify(prompt)?;
        let tone = Tone::from_label(&sentiment.label);
        let instruction = tone.instruction(prompt);
        tracing::debug!(
            label = %sentiment.label,
            score = sentiment.score,
            ?tone,
            max_length = settings.max_length(),
            temperature = settings.temperature(),
            "generating story"
        );

        let text = self.generator.generate(&instruction, settings)?;

        Ok(Submission::Story(Story {
            sentiment,
            tone,
            instruction,
            text,
        }))
    }
}
