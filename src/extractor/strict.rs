use tracing::debug;

use super::report::{RenderStyle, SentimentReport};
use super::{ExtractionStrategy, Tier};

/// Tier 1: the whole response is a well-formed JSON report.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictJson;

impl ExtractionStrategy for StrictJson {
    fn tier(&self) -> Tier {
        Tier::Strict
    }

    fn attempt(&self, raw: &str) -> Option<SentimentReport> {
        if !raw.trim_start().starts_with('{') {
            return None;
        }
        match serde_json::from_str::<SentimentReport>(raw) {
            // A well-formed object with no report fields is a refusal, not a report
            Ok(report) if report.render_lines(RenderStyle::Exact).len() <= 1 => {
                debug!("JSON from generation service carries no report fields");
                None
            }
            Ok(report) => Some(report),
            Err(e) => {
                debug!("Failed to parse JSON from generation service: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_object_prefix() {
        assert!(StrictJson.attempt("Here is the JSON: {}").is_none());
        assert!(StrictJson.attempt("[1, 2]").is_none());
    }

    #[test]
    fn test_rejects_trailing_prose() {
        assert!(StrictJson.attempt(r#"{"segments": []} hope this helps"#).is_none());
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        assert!(StrictJson.attempt(r#"{"segments": "none"}"#).is_none());
    }

    #[test]
    fn test_rejects_object_without_report_fields() {
        let raw = r#"{"error": "I cannot analyze this text because it is empty."}"#;
        assert!(StrictJson.attempt(raw).is_none());
        assert!(StrictJson.attempt("{}").is_none());
    }

    #[test]
    fn test_accepts_leading_whitespace() {
        let report = StrictJson
            .attempt("\n  {\"summary\": {\"global_sentiment\": \"neutral\"}}")
            .unwrap();
        assert_eq!(report.summary.global_sentiment.as_deref(), Some("neutral"));
    }
}
