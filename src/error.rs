//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust
/// use sentiment_storyteller::error::PipelineError;
///
/// fn describe(e: &PipelineError) -> &'static str {
///     match e {
///         PipelineError::Download(_) => "could not fetch model files",
///         PipelineError::Device(_) => "device unavailable, drop --cuda",
///         PipelineError::InvalidParams(_) => "settings out of range",
///         _ => "inference failed",
///     }
/// }
///
/// let err = PipelineError::InvalidParams("temperature 3.0 outside 0.1..=1.0".into());
/// assert_eq!(describe(&err), "settings out of range");
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Network or download failure.
    #[error("{0}")]
    Download(String),

    /// Tokenization failure.
    #[error("{0}")]
    Tokenization(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// Failure inside the sampling loop.
    #[error("{0}")]
    Generation(String),

    /// Generation settings outside their allowed range.
    #[error("{0}")]
    InvalidParams(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for PipelineError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        PipelineError::Download(format!("HuggingFace API error: {value}"))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}
