use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const DEFAULT_INPUT_TEXT: &str = "daba ana kankoun bzaf mea abdou, chi mrrat kaybanlia driyef bzaf walakin \
be3d lmrrat kaydir chi f3ayl khaybin bzaf. ana normalement kay3jbni nhder \
m3ah bzaf hitach huwa driyef bzaf";

/// Main configuration structure loaded from media_monitor.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub pipeline: PipelineConfig,
    pub scraper: ScraperConfig,
    pub log_level: String,
    /// File the settings were read from; `None` when defaults were used
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Connection settings for the OpenAI-compatible generation service
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    /// Never read from the TOML file; credentials come from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub translation_max_tokens: u32,
    pub translation_temperature: f32,
    pub sentiment_max_tokens: u32,
    pub sentiment_temperature: f32,
}

/// What the pipeline does with the prompt text when the caller does not say
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_mode: String,
    pub translation_languages: Vec<String>,
    pub default_input_text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cerebras.ai/v1".to_string(),
            api_key: None,
            model: "gpt-oss-120b".to_string(),
            timeout_ms: 60_000,
            translation_max_tokens: 400,
            translation_temperature: 0.1,
            sentiment_max_tokens: 900,
            sentiment_temperature: 0.0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_mode: "both".to_string(),
            translation_languages: vec!["English".to_string(), "French".to_string()],
            default_input_text: DEFAULT_INPUT_TEXT.to_string(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            user_agent: concat!("media-monitor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            pipeline: PipelineConfig::default(),
            scraper: ScraperConfig::default(),
            log_level: "media_monitor=info".to_string(),
            source: None,
        }
    }
}

/// Split a comma-separated language list, dropping blank entries
pub fn parse_language_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// MEDIA_MONITOR_CONFIG, or "media_monitor.toml" in the working directory
pub fn config_path() -> PathBuf {
    std::env::var("MEDIA_MONITOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("media_monitor.toml"))
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Runs before logging is set up, so nothing is logged here; callers report
    /// [`Config::source`] once tracing is initialized.
    pub fn load() -> Result<Self> {
        if let Ok(env_path) = std::env::var("MM_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }
        Self::load_from_path(&config_path())
    }

    /// Read `path` if it exists (defaults otherwise), then apply env overrides and validate
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut config = Self::from_toml_str(&content)?;
                config.source = Some(path.to_path_buf());
                config
            }
            Err(_) => Self::default(),
        };

        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides (env-first). `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CEREBRAS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.generation.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup("MM_GENERATION_URL") {
            self.generation.base_url = url;
        }
        if let Some(model) = lookup("CEREBRAS_MODEL") {
            self.generation.model = model;
        }
        if let Some(timeout) = lookup("MM_GENERATION_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.generation.timeout_ms = timeout;
        }
        if let Some(mode) = lookup("DARIJA_OUTPUT_MODE") {
            self.pipeline.default_mode = mode.trim().to_lowercase();
        }
        if let Some(langs) = lookup("DARIJA_TRANSLATION_LANGUAGES") {
            self.pipeline.translation_languages = parse_language_list(&langs);
        }
        if let Some(text) = lookup("DARIJA_TEXT") {
            self.pipeline.default_input_text = text.trim().to_string();
        }
        if let Some(timeout) = lookup("MM_SCRAPER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.scraper.timeout_ms = timeout;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.generation.model.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "generation model id must not be empty".to_string(),
            });
        }
        if self.generation.timeout_ms == 0 {
            return Err(PipelineError::Config {
                message: "MM_GENERATION_TIMEOUT_MS must be > 0".to_string(),
            });
        }
        if self.scraper.timeout_ms == 0 {
            return Err(PipelineError::Config {
                message: "MM_SCRAPER_TIMEOUT_MS must be > 0".to_string(),
            });
        }
        if !self.generation.base_url.starts_with("http://")
            && !self.generation.base_url.starts_with("https://")
        {
            tracing::warn!(
                "Generation URL '{}' doesn't start with http:// or https://",
                self.generation.base_url
            );
        }
        Ok(())
    }
}
