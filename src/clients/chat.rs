//! Blocking client for OpenAI-compatible `/chat/completions` endpoints (Cerebras by default).

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::traits::{ChatRequest, Completion, CompletionSource, TextGenerator};
use crate::config::GenerationConfig;
use crate::error::{PipelineError, Result};
use crate::utils::truncate_chars;

const ERROR_BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::Config {
                message: "CEREBRAS_API_KEY is not set".to_string(),
            })?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Timeouts, whether hit while sending or while reading the body, carry the
    /// configured budget; anything else keeps the transport's own message.
    fn transport_error(&self, err: reqwest::Error, context: &str) -> PipelineError {
        if err.is_timeout() {
            PipelineError::GenerationService {
                message: format!(
                    "generation request timed out after {}ms",
                    self.timeout.as_millis()
                ),
            }
        } else {
            PipelineError::GenerationService {
                message: format!("{}: {}", context, err),
            }
        }
    }
}

impl TextGenerator for ChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "max_completion_tokens": request.max_tokens,
            "temperature": request.temperature,
            "top_p": 1,
            "stream": false,
        });
        debug!(
            "Calling generation service (model={}, max_tokens={})",
            self.model, request.max_tokens
        );

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e, "HTTP request failed"))?;

        let status = resp.status();
        let body_text = resp
            .text()
            .map_err(|e| self.transport_error(e, "Failed to read completion body"))?;
        check_http_status(status.as_u16(), &body_text, "Chat completion")?;

        let val: Value =
            serde_json::from_str(&body_text).map_err(|e| PipelineError::GenerationService {
                message: format!("Failed to decode completion response: {}", e),
            })?;
        parse_completion(&val)
    }
}

/// Map a non-success HTTP status to an error; `Ok(())` for 2xx.
pub fn check_http_status(status: u16, body: &str, operation: &str) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let preview = truncate_chars(body, ERROR_BODY_PREVIEW_CHARS);
    let hint = match status {
        401 | 403 => " (check CEREBRAS_API_KEY)",
        429 => " (rate limited)",
        500..=599 => " (service unavailable)",
        _ => "",
    };
    Err(PipelineError::GenerationService {
        message: format!("{} failed with HTTP {}{}: {}", operation, status, hint, preview),
    })
}

/// Pull the answer text out of a chat-completions response.
///
/// `message.content` is preferred; reasoning-style models sometimes leave it empty
/// and put the answer in `message.reasoning`, which is returned tagged as
/// [`CompletionSource::Reasoning`].
pub fn parse_completion(val: &Value) -> Result<Completion> {
    let message = val
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"));

    let field = |name: &str| {
        message
            .and_then(|m| m.get(name))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if let Some(content) = field("content") {
        return Ok(Completion::from_content(content));
    }
    if let Some(reasoning) = field("reasoning") {
        warn!("Generation service returned no content; using reasoning field as answer");
        return Ok(Completion {
            text: reasoning.to_string(),
            source: CompletionSource::Reasoning,
        });
    }

    let preview = truncate_chars(&val.to_string(), ERROR_BODY_PREVIEW_CHARS);
    Err(PipelineError::GenerationService {
        message: format!("No text content returned from generation service: {}", preview),
    })
}
