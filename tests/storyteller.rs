//! End-to-end flow through the public API with stand-in models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use sentiment_storyteller::error::{PipelineError, Result};
use sentiment_storyteller::sentiment::Prediction;
use sentiment_storyteller::story::{
    GenerationSettings, SentimentClassifier, Storyteller, Submission, TextGenerator, Tone,
};
use sentiment_storyteller::ui::{router, AppState};
use tower::ServiceExt;

/// Labels prompts by a keyword, the way a tiny lexicon model would.
struct KeywordClassifier {
    calls: AtomicUsize,
}

impl SentimentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let label = if text.contains("love") { "positive" } else { "negative" };
        Ok(Prediction {
            label: label.into(),
            score: 0.83,
        })
    }
}

/// Records what it was asked and echoes the instruction like a raw LM.
#[derive(Default)]
struct RecordingGenerator {
    seen: Mutex<Vec<(String, GenerationSettings)>>,
}

impl TextGenerator for RecordingGenerator {
    fn generate(&self, instruction: &str, settings: &GenerationSettings) -> Result<String> {
        self.seen
            .lock()
            .unwrap()
            .push((instruction.to_string(), *settings));
        Ok(format!("{instruction}\n\nThe end."))
    }
}

fn fixtures() -> (Arc<KeywordClassifier>, Arc<RecordingGenerator>, Storyteller) {
    let classifier = Arc::new(KeywordClassifier {
        calls: AtomicUsize::new(0),
    });
    let generator = Arc::new(RecordingGenerator::default());
    let storyteller = Storyteller::new(classifier.clone(), generator.clone());
    (classifier, generator, storyteller)
}

#[test]
fn lowercase_positive_label_picks_optimistic_tone() -> Result<()> {
    let (_, generator, storyteller) = fixtures();

    let Submission::Story(story) =
        storyteller.submit("I love the sea", &GenerationSettings::default())?
    else {
        panic!("expected a story");
    };

    assert_eq!(story.tone, Tone::Optimistic);
    assert_eq!(
        story.text,
        "Write a happy and optimistic story about: I love the sea\n\nThe end."
    );
    assert_eq!(
        story.sentiment_display().to_string(),
        "Detected Sentiment: positive (0.83 confidence)"
    );
    assert_eq!(generator.seen.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn settings_reach_the_generator_unchanged() -> Result<()> {
    let (_, generator, storyteller) = fixtures();
    let settings = GenerationSettings::new(50, 1.0)?;

    storyteller.submit("a broken clock", &settings)?;

    let seen = generator.seen.lock().unwrap();
    assert_eq!(seen[0].0, "Write a dark or serious story about: a broken clock");
    assert_eq!(seen[0].1, settings);
    Ok(())
}

#[test]
fn invalid_settings_never_reach_the_models() {
    let err = GenerationSettings::new(500, 0.7).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidParams(_)));
}

#[tokio::test]
async fn form_round_trip_through_router() -> anyhow::Result<()> {
    let (classifier, generator, storyteller) = fixtures();
    let app = router(AppState::new(storyteller)?);

    let response = app
        .clone()
        .oneshot(
            Request::post("/generate")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("prompt=&max_length=80&temperature=0.5"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(response.into_body().collect().await?.to_bytes().to_vec())?;
    assert!(html.contains("Please enter a prompt first."));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

    let response = app
        .oneshot(
            Request::post("/api/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"prompt":"the war ended","max_length":80,"temperature":0.5}"#,
                ))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
    assert_eq!(body["tone"], "serious");
    assert_eq!(body["sentiment"]["label"], "negative");
    assert_eq!(
        generator.seen.lock().unwrap()[0].1,
        GenerationSettings::new(80, 0.5)?
    );
    Ok(())
}
