//! Text generation pipeline.
//!
//! Completes raw prompts with a quantized causal language model. The output
//! text starts with the prompt itself, followed by the sampled continuation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sentiment_storyteller::text_generation::{Qwen3Size, TextGenerationPipelineBuilder};
//!
//! # fn main() -> sentiment_storyteller::error::Result<()> {
//! let pipeline = TextGenerationPipelineBuilder::qwen3(Qwen3Size::Size0_6B)
//!     .temperature(0.7)
//!     .max_len(100)
//!     .build()?;
//!
//! let output = pipeline.run("Once upon a time")?;
//! println!("{}", output.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Supported Models
//!
//! | Model | Sizes | Builder Method |
//! |-------|-------|----------------|
//! | Qwen 3 | `Size0_6B`, `Size1_7B`, `Size4B` | [`TextGenerationPipelineBuilder::qwen3`] |
//! | Llama 3.2 | `Size1B`, `Size3B` | [`TextGenerationPipelineBuilder::llama3_2`] |

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod params;
pub(crate) mod pipeline;

// ============ Public API ============

pub use crate::models::{Llama3_2, Llama3_2Size, Qwen3, Qwen3Size};
pub use crate::pipelines::stats::GenerationStats;
pub use builder::TextGenerationPipelineBuilder;
pub use params::GenerationParams;
pub use pipeline::{Output, TextGenerationPipeline};
