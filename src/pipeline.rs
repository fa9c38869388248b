//! Scrape → flatten → generate → extract, collapsed into a [`ResultEnvelope`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::clients::CompletionSource;
use crate::error::{PipelineError, Result};
use crate::extractor;
use crate::flatten::flatten;
use crate::plugins::{invoke, CallArgs};
use crate::registry::{GenerationTask, PluginRegistry, FALLBACK_LANGUAGE};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Scraping,
    Flattening,
    Generating,
    Extracting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Scraping => "scraping",
            Stage::Flattening => "flattening",
            Stage::Generating => "generating",
            Stage::Extracting => "extracting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a text run should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Sentiment,
    Translation,
    Both,
}

impl OutputMode {
    /// Unknown values fall back to `Both`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "sentiment" => OutputMode::Sentiment,
            "translation" => OutputMode::Translation,
            "both" => OutputMode::Both,
            other => {
                warn!("Unknown output mode '{}'; using both", other);
                OutputMode::Both
            }
        }
    }

    pub fn wants_translation(self) -> bool {
        matches!(self, OutputMode::Translation | OutputMode::Both)
    }

    pub fn wants_sentiment(self) -> bool {
        matches!(self, OutputMode::Sentiment | OutputMode::Both)
    }
}

/// One pipeline invocation: an optional URL plus free-form options
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub url: Option<String>,
    pub options: CallArgs,
}

impl PipelineRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            options: CallArgs::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a run. Exactly one of `output` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Flattened text sent to the generator; `None` when the run failed before flattening
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Degradations worth showing next to the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ResultEnvelope {
    pub fn success(input: String, output: String) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            error: None,
            notes: Vec::new(),
        }
    }

    pub fn failure(input: Option<String>, error: impl Into<String>) -> Self {
        Self {
            input,
            output: None,
            error: Some(error.into()),
            notes: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Text plus where it came from, read from a generator's return value.
///
/// Generators may return a bare string or a `{"text", "source"}` object.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
    pub text: String,
    pub source: CompletionSource,
}

impl GeneratedText {
    pub fn from_value(value: Value) -> Result<Self> {
        let (text, source) = match value {
            Value::String(s) => (s, CompletionSource::Content),
            Value::Object(mut map) => {
                let text = match map.remove("text") {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };
                let source = map
                    .remove("source")
                    .and_then(|s| serde_json::from_value(s).ok())
                    .unwrap_or(CompletionSource::Content);
                (text, source)
            }
            other => {
                return Err(PipelineError::GenerationService {
                    message: format!("generator returned non-text value: {}", other),
                });
            }
        };
        if text.trim().is_empty() {
            return Err(PipelineError::GenerationService {
                message: "generator returned empty text".to_string(),
            });
        }
        Ok(Self { text, source })
    }
}

struct Run {
    stage: Stage,
    input: Option<String>,
    notes: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            input: None,
            notes: Vec::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn execute(&mut self, registry: &PluginRegistry, request: PipelineRequest) -> Result<String> {
        let mut options = request.options;
        let mode = options
            .remove("mode")
            .map(option_string)
            .unwrap_or_else(|| "sentiment".to_string());
        let target_language = options.remove("target_language").map(option_string);
        if let Some(url) = request.url {
            options.entry("url").or_insert(Value::String(url));
        }

        self.advance(Stage::Scraping);
        let scraper = registry.resolve_scraper()?;
        let payload = invoke(scraper.as_ref(), &options)?;

        self.advance(Stage::Flattening);
        let prompt = flatten(&payload);
        debug!("Flattened payload to {} chars", prompt.chars().count());
        self.input = Some(prompt.clone());

        self.advance(Stage::Generating);
        let generator = registry.resolve_generator(&mode)?;
        let mut args = CallArgs::new();
        args.insert("text".into(), Value::String(prompt));
        if generator.task == GenerationTask::Translation {
            let language = if generator.is_fallback {
                target_language.unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
            } else {
                registry.target_language(target_language.as_deref())
            };
            args.insert("target_language".into(), Value::String(language));
        }
        let generated = GeneratedText::from_value(invoke(generator.capability.as_ref(), &args)?)?;
        if generated.source == CompletionSource::Reasoning {
            self.notes
                .push("output taken from the model's reasoning field, not its final answer".into());
        }

        if generator.task == GenerationTask::Translation {
            return Ok(generated.text);
        }

        self.advance(Stage::Extracting);
        let extraction = extractor::extract(&generated.text);
        if extraction.tier.is_degraded() {
            self.notes
                .push("structured extraction failed; output is the raw model response".into());
        }
        Ok(extraction.text)
    }
}

fn option_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Run the full pipeline. Never fails: errors land in the envelope's `error` field.
pub fn run_pipeline(registry: &PluginRegistry, request: PipelineRequest) -> ResultEnvelope {
    let mut run = Run::new();
    let url = request.url.clone();
    match run.execute(registry, request) {
        Ok(output) => {
            run.advance(Stage::Done);
            info!(
                "Pipeline finished for {}",
                url.as_deref().unwrap_or("<no url>")
            );
            let mut envelope = ResultEnvelope::success(run.input.unwrap_or_default(), output);
            envelope.notes = run.notes;
            envelope
        }
        Err(e) => {
            let failed_at = run.stage;
            run.advance(Stage::Failed);
            if e.is_fatal() {
                error!("Pipeline failed during {}: {}", failed_at, e);
            } else {
                warn!("Pipeline stopped during {}: {}", failed_at, e);
            }
            let mut envelope = ResultEnvelope::failure(run.input, e.to_string());
            envelope.notes = run.notes;
            envelope
        }
    }
}

/// A translation into one language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub language: String,
    pub text: String,
}

/// Translate `text` into each language. Per-language failures become `[ERROR: ...]`
/// entries; only a missing translator fails the whole call.
pub fn translate_all(registry: &PluginRegistry, text: &str, languages: &[String]) -> Result<Vec<Translation>> {
    let translator = registry.translator().ok_or_else(|| {
        PipelineError::capability_not_found("translator", "no translator is registered")
    })?;

    Ok(languages
        .iter()
        .map(|language| {
            let mut args = CallArgs::new();
            args.insert("text".into(), Value::String(text.to_string()));
            args.insert("target_language".into(), Value::String(language.clone()));
            let text = invoke(translator.as_ref(), &args)
                .and_then(GeneratedText::from_value)
                .map(|g| g.text)
                .unwrap_or_else(|e| {
                    warn!("Translation to {} failed: {}", language, e);
                    format!("[ERROR: {}]", e)
                });
            Translation {
                language: language.clone(),
                text,
            }
        })
        .collect())
}

/// Combined result of a text run
#[derive(Debug, Clone, Serialize)]
pub struct TextReport {
    pub input: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<Translation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<ResultEnvelope>,
}

/// Translate and/or analyse `text` directly, feeding it through the registry's
/// `Scraper` type as its `text` option.
pub fn analyze_text(registry: &PluginRegistry, text: &str, mode: OutputMode) -> TextReport {
    let mut report = TextReport {
        input: text.to_string(),
        translations: Vec::new(),
        translation_error: None,
        sentiment: None,
    };

    if mode.wants_translation() {
        match translate_all(registry, text, registry.translation_languages()) {
            Ok(translations) => report.translations = translations,
            Err(e) => {
                error!("Translation skipped: {}", e);
                report.translation_error = Some(e.to_string());
            }
        }
    }

    if mode.wants_sentiment() {
        let request = PipelineRequest::new()
            .with_option("text", text)
            .with_option("mode", "sentiment");
        report.sentiment = Some(run_pipeline(registry, request));
    }
    report
}
