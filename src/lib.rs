//! Sentiment-aware story generation on local Candle models.
//!
//! A prompt is classified with a sentiment model, wrapped in an optimistic or
//! serious writing instruction depending on the label, and completed by a
//! quantized causal language model. The [`story`] module holds that flow,
//! [`ui`] serves it as a small web form, and the [`sentiment`] and
//! [`text_generation`] pipelines can be used on their own.

#![warn(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod models;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod error;
pub mod story;
pub mod ui;

pub use pipelines::utils::DeviceRequest;
pub use pipelines::{sentiment, text_generation};
