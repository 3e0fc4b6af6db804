use std::sync::Arc;

use serde::Serialize;
use tokenizers::Tokenizer;

use crate::error::Result;
use crate::models::capabilities::SentimentAnalysisModel;
use crate::pipelines::stats::PipelineStats;

// ============ Output types ============

/// A sentiment prediction with label and confidence score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// The predicted sentiment in upper case (e.g. "POSITIVE", "NEGATIVE").
    pub label: String,
    /// Confidence score (0.0 to 1.0).
    pub score: f32,
}

/// Output from [`SentimentAnalysisPipeline::run`].
#[derive(Debug)]
pub struct Output {
    /// Sentiment prediction.
    pub prediction: Prediction,
    /// Execution statistics.
    pub stats: PipelineStats,
}

// ============ Pipeline ============

/// Classifies text sentiment.
///
/// Construct with [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder).
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: Arc<M>,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Analyze the sentiment of one text.
    pub fn run(&self, text: &str) -> Result<Output> {
        let stats = PipelineStats::start();
        let _span = tracing::debug_span!("sentiment", chars = text.len()).entered();

        let result = self.model.predict_with_score(&self.tokenizer, text)?;
        let prediction = Prediction {
            label: result.label.to_uppercase(),
            score: result.score.clamp(0.0, 1.0),
        };

        Ok(Output {
            prediction,
            stats: stats.finish(1),
        })
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;
    use crate::models::capabilities::SentimentResult;

    /// Answers with a fixed checkpoint-style label.
    struct FixedLabel {
        label: &'static str,
        score: f32,
        device: Device,
    }

    impl SentimentAnalysisModel for FixedLabel {
        type Options = ();

        fn new(_: (), device: Device) -> Result<Self> {
            Ok(FixedLabel {
                label: "positive",
                score: 1.0,
                device,
            })
        }

        fn predict_with_score(&self, _: &Tokenizer, _: &str) -> Result<SentimentResult> {
            Ok(SentimentResult {
                label: self.label.to_string(),
                score: self.score,
            })
        }

        fn get_tokenizer(_: ()) -> Result<Tokenizer> {
            let json = serde_json::json!({
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [],
                "normalizer": null,
                "pre_tokenizer": { "type": "Whitespace" },
                "post_processor": null,
                "decoder": null,
                "model": { "type": "WordLevel", "vocab": { "[UNK]": 0 }, "unk_token": "[UNK]" }
            });
            Ok(json.to_string().parse().unwrap())
        }

        fn device(&self) -> &Device {
            &self.device
        }
    }

    fn pipeline(label: &'static str, score: f32) -> SentimentAnalysisPipeline<FixedLabel> {
        SentimentAnalysisPipeline {
            model: Arc::new(FixedLabel {
                label,
                score,
                device: Device::Cpu,
            }),
            tokenizer: FixedLabel::get_tokenizer(()).unwrap(),
        }
    }

    #[test]
    fn labels_are_upper_cased() {
        for (raw, shown) in [("positive", "POSITIVE"), ("negative", "NEGATIVE"), ("Neutral", "NEUTRAL")] {
            let output = pipeline(raw, 0.8).run("some text").unwrap();
            assert_eq!(output.prediction.label, shown);
        }
    }

    #[test]
    fn score_is_clamped_to_unit_range() {
        let output = pipeline("positive", 1.000_001).run("some text").unwrap();
        assert_eq!(output.prediction.score, 1.0);
        assert_eq!(output.stats.items_processed, 1);
    }
}
