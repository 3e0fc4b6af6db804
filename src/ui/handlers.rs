use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;

use super::page::{PageView, SliderValues};
use super::AppState;
use crate::error::PipelineError;
use crate::story::{GenerationSettings, Submission, DEFAULT_MAX_LENGTH, DEFAULT_TEMPERATURE};

/// Body of `POST /generate` and `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Free-form prompt.
    #[serde(default)]
    pub prompt: String,
    /// Total length bound; defaults to 100.
    pub max_length: Option<usize>,
    /// Sampling temperature; defaults to 0.7.
    pub temperature: Option<f64>,
}

impl GenerateRequest {
    // A blank prompt gets the warning whatever the sliders say.
    fn is_blank(&self) -> bool {
        self.prompt.trim().is_empty()
    }

    fn settings(&self) -> crate::error::Result<GenerationSettings> {
        GenerationSettings::new(
            self.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        )
    }

    fn slider_values(&self) -> SliderValues {
        SliderValues {
            max_length: self.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidParams(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render_page(state: &AppState, status: StatusCode, view: &PageView<'_>) -> Response {
    match state.pages.render(view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

pub(crate) async fn index(State(state): State<AppState>) -> Response {
    render_page(&state, StatusCode::OK, &PageView::default())
}

pub(crate) async fn generate_page(
    State(state): State<AppState>,
    Form(request): Form<GenerateRequest>,
) -> Response {
    let mut view = PageView {
        prompt: &request.prompt,
        settings: request.slider_values(),
        ..Default::default()
    };

    if request.is_blank() {
        view.warning = Submission::MissingPrompt.warning();
        return render_page(&state, StatusCode::OK, &view);
    }

    let settings = match request.settings() {
        Ok(settings) => settings,
        Err(e) => {
            view.error = Some(e.to_string());
            return render_page(&state, status_for(&e), &view);
        }
    };
    view.settings = settings.into();

    match state.submit(request.prompt.clone(), settings).await {
        Ok(Submission::MissingPrompt) => {
            view.warning = Submission::MissingPrompt.warning();
            render_page(&state, StatusCode::OK, &view)
        }
        Ok(Submission::Story(story)) => {
            let view = PageView {
                story: Some(&story),
                ..view
            };
            render_page(&state, StatusCode::OK, &view)
        }
        Err(e) => {
            tracing::error!(error = %e, "story generation failed");
            view.error = Some(e.to_string());
            render_page(&state, status_for(&e), &view)
        }
    }
}

pub(crate) async fn generate_api(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if request.is_blank() {
        return missing_prompt();
    }

    let settings = match request.settings() {
        Ok(settings) => settings,
        Err(e) => return json_error(status_for(&e), &e.to_string()),
    };

    match state.submit(request.prompt, settings).await {
        Ok(Submission::Story(story)) => Json(story).into_response(),
        Ok(Submission::MissingPrompt) => missing_prompt(),
        Err(e) => {
            tracing::error!(error = %e, "story generation failed");
            json_error(status_for(&e), &e.to_string())
        }
    }
}

fn missing_prompt() -> Response {
    json_error(
        StatusCode::UNPROCESSABLE_ENTITY,
        Submission::MissingPrompt.warning().unwrap_or_default(),
    )
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
