//! Tier 2: field-by-field regex recovery from JSON-ish text.
//!
//! Every matcher runs independently over the raw text, so a broken brace or a
//! stray comment only costs the fields it touches.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::report::{RenderStyle, Segment, SentimentReport, Stats, Summary, TargetMention};
use super::{ExtractionStrategy, Tier};

static GLOBAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"global_sentiment"\s*:\s*"([^"]+)""#).unwrap());
static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:short_summary|short_french_summary)"\s*:\s*"([^"]+)""#).unwrap()
});
static JUDGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:final_judgment|final_judgment_sentence)"\s*:\s*"([^"]+)""#).unwrap()
});
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)\{\s*"index"\s*:\s*(\d+)\s*,\s*"text"\s*:\s*"([^"]*)"\s*,\s*"sentiment"\s*:\s*"([^"]*)""#,
    )
    .unwrap()
});
static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:positive_percent|positive_pct)"\s*:\s*(\d+)"#).unwrap()
});
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:negative_percent|negative_pct)"\s*:\s*(\d+)"#).unwrap()
});
static NEUTRAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:neutral_percent|neutral_pct)"\s*:\s*(\d+)"#).unwrap()
});
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)\{\s*"segment_index"\s*:\s*(\d+)\s*,\s*"text"\s*:\s*"([^"]*)"\s*,\s*"target"\s*:\s*"([^"]*)"\s*,\s*"reason"\s*:\s*"([^"]*)"\s*,\s*"(?:certainty_percent|certainty_pct)"\s*:\s*(\d+)"#,
    )
    .unwrap()
});

#[derive(Debug, Default, Clone, Copy)]
pub struct PatternRecovery;

impl ExtractionStrategy for PatternRecovery {
    fn tier(&self) -> Tier {
        Tier::Recovered
    }

    fn attempt(&self, raw: &str) -> Option<SentimentReport> {
        let report = recover(raw);
        // Header only: nothing worth presenting over the raw text.
        if report.render_lines(RenderStyle::Approximate).len() <= 1 {
            return None;
        }
        Some(report)
    }
}

/// Run every field matcher over `raw` and assemble whatever was found.
pub fn recover(raw: &str) -> SentimentReport {
    let summary = Summary {
        global_sentiment: first_capture(&GLOBAL_RE, raw),
        short_summary: first_capture(&SUMMARY_RE, raw),
        final_judgment: first_capture(&JUDGMENT_RE, raw),
    };

    let segments: Vec<Segment> = SEGMENT_RE
        .captures_iter(raw)
        .map(|caps| Segment {
            index: int_group(&caps, 1),
            text: str_group(&caps, 2),
            sentiment: str_group(&caps, 3),
        })
        .collect();

    let mut stats = Stats {
        positive_pct: first_int(&POSITIVE_RE, raw),
        negative_pct: first_int(&NEGATIVE_RE, raw),
        neutral_pct: first_int(&NEUTRAL_RE, raw),
    };
    if !stats.is_complete() && !segments.is_empty() {
        tracing::debug!(
            "Percentages incomplete; approximating from {} recovered segments",
            segments.len()
        );
        stats = Stats::approximate_from(&segments);
    }

    let negative_target_mentions = MENTION_RE
        .captures_iter(raw)
        .map(|caps| TargetMention {
            segment_index: int_group(&caps, 1),
            text: str_group(&caps, 2),
            target: str_group(&caps, 3),
            reason: Some(str_group(&caps, 4)).filter(|r| !r.is_empty()),
            certainty_pct: int_group(&caps, 5),
        })
        .collect();

    SentimentReport {
        summary,
        segments,
        stats,
        negative_target_mentions,
    }
}

fn first_capture(re: &Regex, raw: &str) -> Option<String> {
    re.captures(raw).map(|caps| str_group(&caps, 1))
}

fn first_int(re: &Regex, raw: &str) -> Option<i64> {
    re.captures(raw).and_then(|caps| int_group(&caps, 1))
}

fn str_group(caps: &Captures<'_>, i: usize) -> String {
    caps.get(i)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn int_group(caps: &Captures<'_>, i: usize) -> Option<i64> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}
