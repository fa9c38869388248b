//! Structured extraction of sentiment reports from unreliable generation output.
//!
//! Strategies run in order and the first one that yields a report wins:
//! strict JSON, then regex recovery. When neither matches, the raw text is passed
//! through unchanged and the run is flagged as degraded.

pub mod recovery;
pub mod report;
pub mod strict;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, warn};

use crate::utils::truncate_chars;

pub use recovery::PatternRecovery;
pub use report::{RenderStyle, Segment, Sentiment, SentimentReport, Stats, Summary, TargetMention};
pub use strict::StrictJson;

const LOG_PREVIEW_CHARS: usize = 200;

/// Which stage of the chain produced the output
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strict,
    Recovered,
    Passthrough,
}

impl Tier {
    pub fn render_style(self) -> RenderStyle {
        match self {
            Tier::Strict => RenderStyle::Exact,
            _ => RenderStyle::Approximate,
        }
    }

    /// Passthrough output is raw model text rather than a structured report
    pub fn is_degraded(self) -> bool {
        self == Tier::Passthrough
    }
}

/// One fallible step in the extraction chain
pub trait ExtractionStrategy: Send + Sync {
    fn tier(&self) -> Tier;
    /// `None` means "no match", never an error.
    fn attempt(&self, raw: &str) -> Option<SentimentReport>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub tier: Tier,
    pub report: Option<SentimentReport>,
    /// Rendered report, or the raw response for passthrough
    pub text: String,
}

pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Strict JSON first, then pattern recovery
    pub fn new() -> Self {
        Self::with_strategies(vec![Box::new(StrictJson), Box::new(PatternRecovery)])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, raw: &str) -> Extraction {
        for strategy in &self.strategies {
            if let Some(report) = strategy.attempt(raw) {
                let tier = strategy.tier();
                debug!("Extraction succeeded at tier {:?}", tier);
                return Extraction {
                    tier,
                    text: report.render(tier.render_style()),
                    report: Some(report),
                };
            }
        }

        warn!(
            "Extraction degraded to raw passthrough ({} chars): {}",
            raw.chars().count(),
            truncate_chars(raw, LOG_PREVIEW_CHARS)
        );
        Extraction {
            tier: Tier::Passthrough,
            report: None,
            text: raw.to_string(),
        }
    }
}

static DEFAULT_EXTRACTOR: Lazy<Extractor> = Lazy::new(Extractor::new);

/// Run the default chain over a raw generation response.
pub fn extract(raw: &str) -> Extraction {
    DEFAULT_EXTRACTOR.extract(raw)
}
