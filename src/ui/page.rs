use minijinja::Environment;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::story::{
    GenerationSettings, Story, DEFAULT_MAX_LENGTH, DEFAULT_TEMPERATURE, MAX_LENGTH_RANGE,
    TEMPERATURE_RANGE,
};

const INDEX_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Sentiment-Aware Text Generator</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; color: #262730; }
    aside { width: 16rem; padding: 1.5rem; background: #f0f2f6; }
    main { flex: 1; max-width: 46rem; padding: 2rem 3rem; }
    label { display: block; margin-top: 1rem; font-size: .9rem; }
    input[type=range] { width: 100%; }
    textarea { width: 100%; height: 100px; font: inherit; padding: .5rem; box-sizing: border-box; }
    button { margin-top: 1rem; padding: .5rem 1rem; font: inherit; cursor: pointer; }
    .info, .warning, .error { padding: .75rem 1rem; border-radius: .4rem; margin-top: 1rem; }
    .info { background: #e8f0fe; }
    .warning { background: #fff8db; }
    .error { background: #fde8e8; }
    .output { white-space: pre-wrap; }
  </style>
</head>
<body>
<form id="story-form" method="post" action="/generate" style="display: contents">
  <aside>
    <h2>Generation Settings</h2>
    <label for="max_length">Max Length (Words): <output id="max_length_value">{{ settings.max_length }}</output></label>
    <input type="range" id="max_length" name="max_length" min="{{ limits.max_length_min }}" max="{{ limits.max_length_max }}" step="1" value="{{ settings.max_length }}"
           oninput="document.getElementById('max_length_value').value = this.value">
    <label for="temperature">Creativity (Temperature): <output id="temperature_value">{{ settings.temperature }}</output></label>
    <input type="range" id="temperature" name="temperature" min="{{ limits.temperature_min }}" max="{{ limits.temperature_max }}" step="0.01" value="{{ settings.temperature }}"
           oninput="document.getElementById('temperature_value').value = this.value">
  </aside>
  <main>
    <h1>🤖 AI Text Generator with Sentiment Analysis</h1>
    <p>This application detects the sentiment of your prompt (Positive/Negative)
    and generates a short paragraph continuing that thought in a matching tone.</p>
    <label for="prompt">Enter your prompt:</label>
    <textarea id="prompt" name="prompt" placeholder="e.g., The futuristic city was silent...">{{ prompt }}</textarea>
    <button type="submit" id="generate">Generate Text</button>
    <p id="spinner" hidden>Analyzing sentiment and writing...</p>
    {% if warning %}<div class="warning">{{ warning }}</div>{% endif %}
    {% if error %}<div class="error"><strong>Error:</strong> {{ error }}</div>{% endif %}
    {% if story %}
    <div class="info">Detected Sentiment: <strong>{{ story.sentiment.label }}</strong> ({{ confidence }} confidence)</div>
    <h3>Generated Output:</h3>
    <div class="output">{{ story.text }}</div>
    {% endif %}
  </main>
</form>
<script>
  document.getElementById('story-form').addEventListener('submit', function () {
    document.getElementById('spinner').hidden = false;
    document.getElementById('generate').disabled = true;
  });
</script>
</body>
</html>
"#;

#[derive(Serialize)]
struct Limits {
    max_length_min: usize,
    max_length_max: usize,
    temperature_min: f64,
    temperature_max: f64,
}

const LIMITS: Limits = Limits {
    max_length_min: *MAX_LENGTH_RANGE.start(),
    max_length_max: *MAX_LENGTH_RANGE.end(),
    temperature_min: *TEMPERATURE_RANGE.start(),
    temperature_max: *TEMPERATURE_RANGE.end(),
};

/// Slider positions echoed back into the form.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct SliderValues {
    pub max_length: usize,
    pub temperature: f64,
}

impl Default for SliderValues {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl From<GenerationSettings> for SliderValues {
    fn from(settings: GenerationSettings) -> Self {
        Self {
            max_length: settings.max_length(),
            temperature: settings.temperature(),
        }
    }
}

/// Everything one render of the page can show.
#[derive(Debug, Default, Serialize)]
pub(crate) struct PageView<'a> {
    pub prompt: &'a str,
    pub settings: SliderValues,
    pub warning: Option<&'a str>,
    pub error: Option<String>,
    pub story: Option<&'a Story>,
}

#[derive(Serialize)]
struct RenderContext<'a> {
    #[serde(flatten)]
    view: &'a PageView<'a>,
    limits: &'a Limits,
    confidence: Option<String>,
}

/// Compiled page templates.
pub(crate) struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)
            .map_err(|e| PipelineError::Unexpected(format!("Invalid page template: {e}")))?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &PageView<'_>) -> Result<String> {
        let ctx = RenderContext {
            view,
            limits: &LIMITS,
            confidence: view
                .story
                .map(|story| format!("{:.2}", story.sentiment.score)),
        };
        self.env
            .get_template("index.html")
            .and_then(|tmpl| tmpl.render(&ctx))
            .map_err(|e| PipelineError::Unexpected(format!("Failed to render page: {e}")))
    }
}
