//! Plugins shipped with the binary: an HTTP page scraper, a static-text scraper
//! type, and generators backed by the chat completion client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::html::html_to_payload;
use super::{required_str, CallArgs, FnCapability, PluginInstance, PluginType, Signature};
use crate::clients::{ChatClient, ChatMessage, ChatRequest, Completion, TextGenerator};
use crate::config::{Config, GenerationConfig, ScraperConfig};
use crate::error::{PipelineError, Result};
use crate::prompts::{sentiment_prompt, translation_prompt};
use crate::registry::{PluginRegistry, FALLBACK_LANGUAGE, SCRAPER_TYPE};

pub const HTTP_SCRAPER: &str = "scrape";
pub const TRANSLATOR: &str = "translate";
pub const SENTIMENT_ANALYZER: &str = "analyze_sentiment";

/// Free-function scraper fetching `url` over HTTP
pub fn http_scraper(config: &ScraperConfig) -> Result<FnCapability> {
    let client = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| PipelineError::Internal {
            message: format!("Failed to build scraper HTTP client: {}", e),
        })?;

    Ok(FnCapability::new(
        HTTP_SCRAPER,
        Signature::named(["url"]),
        move |args| {
            let url = required_str(&args, "url", HTTP_SCRAPER)?;
            fetch_page(&client, url)
        },
    ))
}

fn fetch_page(client: &Client, url: &str) -> Result<Value> {
    debug!("Fetching {}", url);
    let fail = |message: String| PipelineError::plugin(HTTP_SCRAPER, message);

    let resp = client
        .get(url)
        .send()
        .map_err(|e| fail(format!("request to {} failed: {}", url, e)))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(fail(format!("{} returned HTTP {}", url, status.as_u16())));
    }
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    let body = resp
        .text()
        .map_err(|e| fail(format!("failed to read body of {}: {}", url, e)))?;

    payload_from_body(url, &content_type, &body).map_err(fail)
}

/// Shape a fetched body into a scraped payload according to its content type.
pub fn payload_from_body(url: &str, content_type: &str, body: &str) -> std::result::Result<Value, String> {
    if content_type.contains("json") {
        return serde_json::from_str(body).map_err(|e| format!("invalid JSON from {}: {}", url, e));
    }
    if content_type.contains("html") || body.trim_start().starts_with('<') {
        return Ok(html_to_payload(url, body));
    }
    Ok(json!({ "url": url, "content": body }))
}

struct StaticText {
    text: String,
}

impl PluginInstance for StaticText {
    fn call_method(&self, _method: &str, _args: CallArgs) -> Result<Value> {
        Ok(Value::String(self.text.clone()))
    }
}

/// `Scraper` type whose `run` returns the constructor's `text`, or `default_text`.
pub fn static_text_scraper(default_text: impl Into<String>) -> PluginType {
    let default_text = default_text.into();
    PluginType::new(SCRAPER_TYPE, Signature::named(["text"]), move |args| {
        let text = args
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(default_text.as_str())
            .to_string();
        Ok(Box::new(StaticText { text }) as Box<dyn PluginInstance>)
    })
    .with_method("run", Signature::default())
}

fn completion_value(completion: Completion) -> Result<Value> {
    Ok(serde_json::to_value(completion)?)
}

pub fn chat_translator(generator: Arc<dyn TextGenerator>, config: &GenerationConfig) -> FnCapability {
    let max_tokens = config.translation_max_tokens;
    let temperature = config.translation_temperature;
    FnCapability::new(
        TRANSLATOR,
        Signature::named(["text", "target_language"]),
        move |args| {
            let text = required_str(&args, "text", TRANSLATOR)?;
            let language = args
                .get("target_language")
                .and_then(Value::as_str)
                .unwrap_or(FALLBACK_LANGUAGE);
            let request = ChatRequest {
                messages: vec![ChatMessage::user(translation_prompt(text, language))],
                max_tokens,
                temperature,
            };
            completion_value(generator.complete(&request)?)
        },
    )
}

pub fn chat_sentiment_analyzer(generator: Arc<dyn TextGenerator>, config: &GenerationConfig) -> FnCapability {
    let max_tokens = config.sentiment_max_tokens;
    let temperature = config.sentiment_temperature;
    FnCapability::new(SENTIMENT_ANALYZER, Signature::named(["text"]), move |args| {
        let text = required_str(&args, "text", SENTIMENT_ANALYZER)?;
        let request = ChatRequest {
            messages: vec![ChatMessage::user(sentiment_prompt(text))],
            max_tokens,
            temperature,
        };
        completion_value(generator.complete(&request)?)
    })
}

/// Register both generators on top of one backend
pub fn register_generators(
    registry: &mut PluginRegistry,
    generator: Arc<dyn TextGenerator>,
    config: &GenerationConfig,
) {
    registry
        .set_translator(chat_translator(Arc::clone(&generator), config))
        .set_sentiment_analyzer(chat_sentiment_analyzer(generator, config));
}

fn attach_chat_generators(registry: &mut PluginRegistry, config: &Config) -> Result<()> {
    if config.generation.api_key.is_none() {
        warn!("CEREBRAS_API_KEY is not set; no generators registered");
        return Ok(());
    }
    let client = ChatClient::new(&config.generation)?;
    debug!("Registering chat generators for model {}", client.model());
    register_generators(registry, Arc::new(client), &config.generation);
    Ok(())
}

/// Registry for URL runs: HTTP scraper plus chat generators
pub fn web_registry(config: &Config) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry
        .register_function(http_scraper(&config.scraper)?)
        .set_translation_languages(config.pipeline.translation_languages.clone());
    attach_chat_generators(&mut registry, config)?;
    Ok(registry)
}

/// Registry for text runs: static text scraper plus chat generators
pub fn text_registry(config: &Config) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry
        .register_type(static_text_scraper(config.pipeline.default_input_text.clone()))
        .set_translation_languages(config.pipeline.translation_languages.clone());
    attach_chat_generators(&mut registry, config)?;
    Ok(registry)
}
