//! Sentiment analysis pipeline.
//!
//! Classify text by polarity. Returns both the predicted label and a
//! confidence score.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sentiment_storyteller::sentiment::{ModernBertSize, SentimentAnalysisPipelineBuilder};
//!
//! # fn main() -> sentiment_storyteller::error::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
//!
//! let output = pipeline.run("I absolutely love this product!")?;
//! println!("sentiment: {} (confidence: {:.2})", output.prediction.label, output.prediction.score);
//! # Ok(())
//! # }
//! ```
//!
//! # Supported Models
//!
//! | Model | Sizes | Builder Method |
//! |-------|-------|----------------|
//! | ModernBERT | `Base`, `Large` | [`SentimentAnalysisPipelineBuilder::modernbert`] |

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod pipeline;

// ============ Public API ============

pub use crate::models::ModernBertSize;
pub use crate::pipelines::stats::PipelineStats;
pub use builder::SentimentAnalysisPipelineBuilder;
pub use pipeline::{Output, Prediction, SentimentAnalysisPipeline};

/// Only for generic annotations. Use [`SentimentAnalysisPipelineBuilder::modernbert`].
pub type SentimentModernBert = crate::models::modernbert::SentimentModernBertModel;
