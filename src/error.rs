//! Domain-specific error types for media-monitor

use thiserror::Error;

/// Main error type for the scrape → generate → extract pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No {capability} capability available: {message}")]
    CapabilityNotFound { capability: String, message: String },

    #[error("Generation service error: {message}")]
    GenerationService { message: String },

    #[error("Plugin '{name}' failed: {message}")]
    Plugin { name: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    pub fn capability_not_found(capability: &str, message: impl Into<String>) -> Self {
        PipelineError::CapabilityNotFound {
            capability: capability.to_string(),
            message: message.into(),
        }
    }

    pub fn plugin(name: &str, message: impl Into<String>) -> Self {
        PipelineError::Plugin {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Errors that end a run as opposed to degrading its output
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::CapabilityNotFound { .. } | PipelineError::GenerationService { .. }
        )
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_not_found_message() {
        let err = PipelineError::capability_not_found("scraper", "nothing registered");
        assert_eq!(
            err.to_string(),
            "No scraper capability available: nothing registered"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_plugin_error_is_not_fatal_class() {
        let err = PipelineError::plugin("scrape", "url is required");
        assert_eq!(err.to_string(), "Plugin 'scrape' failed: url is required");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: PipelineError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PipelineError::Serialization { .. }));
    }
}
