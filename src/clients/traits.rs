use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One completion request against the generation service
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Which field of the service response the text was read from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Content,
    /// Exploratory text from reasoning-style models, used only when `content` is empty
    Reasoning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub source: CompletionSource,
}

impl Completion {
    pub fn from_content(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CompletionSource::Content,
        }
    }

    pub fn is_reasoning_fallback(&self) -> bool {
        self.source == CompletionSource::Reasoning
    }
}

/// A blocking text-generation backend
pub trait TextGenerator: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<Completion>;
}
