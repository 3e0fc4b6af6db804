//! Web form for the storyteller.
//!
//! | Route | |
//! |-------|--|
//! | `GET /` | the form |
//! | `POST /generate` | form submission, re-renders the page with the result |
//! | `POST /api/generate` | JSON in, [`Story`](crate::story::Story) out |
//! | `GET /health` | liveness check |
//!
//! Requests are served one at a time: inference runs on the blocking pool
//! while the next request waits on a gate.

pub(crate) mod handlers;
pub(crate) mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;

use crate::error::{PipelineError, Result};
use crate::story::{GenerationSettings, Storyteller, Submission};

pub use handlers::GenerateRequest;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    storyteller: Storyteller,
    gate: Arc<Mutex<()>>,
    pages: Arc<page::Pages>,
}

impl AppState {
    /// Wrap a storyteller for serving.
    pub fn new(storyteller: Storyteller) -> Result<Self> {
        Ok(Self {
            storyteller,
            gate: Arc::new(Mutex::new(())),
            pages: Arc::new(page::Pages::new()?),
        })
    }

    // The guard moves into the blocking task, so a dropped request keeps the
    // gate closed until its inference has finished.
    async fn submit(&self, prompt: String, settings: GenerationSettings) -> Result<Submission> {
        let turn = self.gate.clone().lock_owned().await;
        tracing::debug!(
            prompt_chars = prompt.chars().count(),
            max_length = settings.max_length(),
            temperature = settings.temperature(),
            "handling story request"
        );
        let storyteller = self.storyteller.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = storyteller.submit(&prompt, &settings);
            drop(turn);
            outcome
        })
        .await
        .map_err(|e| PipelineError::Unexpected(format!("Generation task failed: {e}")))?
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/generate", post(handlers::generate_page))
        .route("/api/generate", post(handlers::generate_api))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind `addr` and serve the form until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "storyteller listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::sentiment::Prediction;
    use crate::story::{SentimentClassifier, TextGenerator};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl SentimentClassifier for Counting {
        fn classify(&self, _: &str) -> Result<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Prediction {
                label: "POSITIVE".into(),
                score: 0.91,
            })
        }
    }

    impl TextGenerator for Counting {
        fn generate(&self, instruction: &str, settings: &GenerationSettings) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{instruction} [{} @ {}]", settings.max_length(), settings.temperature()))
        }
    }

    struct Broken;

    impl TextGenerator for Broken {
        fn generate(&self, _: &str, _: &GenerationSettings) -> Result<String> {
            Err(PipelineError::Generation("Sampling failed: NaN logits".into()))
        }
    }

    /// Sleeps through each generation and records the peak overlap.
    #[derive(Default)]
    struct Slow {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TextGenerator for Slow {
        fn generate(&self, instruction: &str, _: &GenerationSettings) -> Result<String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(instruction.to_string())
        }
    }

    fn app(models: &Arc<Counting>) -> Router {
        let storyteller = Storyteller::new(models.clone(), models.clone());
        router(AppState::new(storyteller).unwrap())
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(body: &str) -> Request<Body> {
        Request::post("/generate")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json(body: serde_json::Value) -> Request<Body> {
        Request::post("/api/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(&Arc::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn index_renders_form() {
        let response = app(&Arc::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Generate Text"));
    }

    #[tokio::test]
    async fn blank_form_prompt_warns_without_model_calls() {
        let models = Arc::new(Counting::default());
        let response = app(&models)
            .oneshot(form("prompt=+++&max_length=100&temperature=0.7"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Please enter a prompt first."));
        assert_eq!(models.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_prompt_warns_even_with_bad_settings() {
        let models = Arc::new(Counting::default());

        let page = app(&models)
            .oneshot(form("prompt=&max_length=100&temperature=1.8"))
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        let html = body_string(page).await;
        assert!(html.contains("Please enter a prompt first."));
        assert!(!html.contains("temperature 1.8 outside"));

        let api = app(&models)
            .oneshot(json(serde_json::json!({ "prompt": " ", "max_length": 5000 })))
            .await
            .unwrap();
        assert_eq!(api.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(api).await.contains("Please enter a prompt first."));

        assert_eq!(models.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn form_submission_renders_story_and_keeps_values() {
        let models = Arc::new(Counting::default());
        let response = app(&models)
            .oneshot(form("prompt=a+red+kite&max_length=150&temperature=0.3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Detected Sentiment: <strong>POSITIVE</strong> (0.91 confidence)"));
        assert!(html.contains("Write a happy and optimistic story about: a red kite [150 @ 0.3]"));
        assert!(html.contains("value=\"150\""));
        assert_eq!(models.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn api_returns_story_json() {
        let response = app(&Arc::default())
            .oneshot(json(serde_json::json!({ "prompt": "sunrise", "max_length": 60 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["sentiment"]["label"], "POSITIVE");
        assert_eq!(body["tone"], "optimistic");
        assert_eq!(
            body["instruction"],
            "Write a happy and optimistic story about: sunrise"
        );
        assert_eq!(
            body["text"],
            "Write a happy and optimistic story about: sunrise [60 @ 0.7]"
        );
    }

    #[tokio::test]
    async fn api_rejects_blank_prompt_and_bad_settings() {
        let models = Arc::new(Counting::default());

        let blank = app(&models)
            .oneshot(json(serde_json::json!({ "prompt": "" })))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let hot = app(&models)
            .oneshot(json(serde_json::json!({ "prompt": "x", "temperature": 1.8 })))
            .await
            .unwrap();
        assert_eq!(hot.status(), StatusCode::BAD_REQUEST);

        assert_eq!(models.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abandoned_request_keeps_the_gate_until_inference_ends() {
        let slow = Arc::new(Slow::default());
        let storyteller = Storyteller::new(Arc::new(Counting::default()), slow.clone());
        let state = AppState::new(storyteller).unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            state.submit("first".into(), GenerationSettings::default()),
        )
        .await;
        assert!(abandoned.is_err());

        let outcome = state
            .submit("second".into(), GenerationSettings::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Submission::Story(_)));
        assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generation_errors_surface_as_500() {
        let storyteller = Storyteller::new(Arc::new(Counting::default()), Arc::new(Broken));
        let app = router(AppState::new(storyteller).unwrap());

        let response = app.oneshot(form("prompt=storm")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("Sampling failed: NaN logits"));
    }
}
