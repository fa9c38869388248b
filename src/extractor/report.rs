//! Canonical sentiment report and its bullet rendering.

use serde::{Deserialize, Serialize};

use crate::deserializers::{
    de_null_as_default, de_option_i64_forgiving, de_option_string_lenient, de_string_lenient,
};

pub const UNKNOWN_LABEL: &str = "unknown";

/// Coarse sentiment class of a free-form label emitted by the service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
    Unknown,
}

impl Sentiment {
    /// Case-insensitive prefix match. The stems cover both the English labels the
    /// prompt asks for and the French ones the service drifts into on Darija input
    /// (`positif`, `negatif`/`négatif`, `neutre`, `mixte`).
    pub fn classify(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.starts_with("posit") {
            Sentiment::Positive
        } else if label.starts_with("negat") || label.starts_with("négat") {
            Sentiment::Negative
        } else if label.starts_with("neutr") {
            Sentiment::Neutral
        } else if label.starts_with("mix") {
            Sentiment::Mixed
        } else {
            Sentiment::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    #[serde(default, deserialize_with = "de_option_string_lenient")]
    pub global_sentiment: Option<String>,
    #[serde(
        default,
        alias = "short_french_summary",
        deserialize_with = "de_option_string_lenient"
    )]
    pub short_summary: Option<String>,
    #[serde(
        default,
        alias = "final_judgment_sentence",
        deserialize_with = "de_option_string_lenient"
    )]
    pub final_judgment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    #[serde(default, deserialize_with = "de_option_i64_forgiving")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "de_string_lenient")]
    pub text: String,
    #[serde(default, deserialize_with = "de_string_lenient")]
    pub sentiment: String,
}

impl Segment {
    /// Segments are never "mixed"; anything outside the three classes is unknown.
    pub fn sentiment(&self) -> Sentiment {
        match Sentiment::classify(&self.sentiment) {
            Sentiment::Mixed => Sentiment::Unknown,
            other => other,
        }
    }
}

/// Percentages exactly as emitted (or approximated); never normalized to 100.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    #[serde(
        default,
        rename = "positive_percent",
        alias = "positive_pct",
        deserialize_with = "de_option_i64_forgiving"
    )]
    pub positive_pct: Option<i64>,
    #[serde(
        default,
        rename = "negative_percent",
        alias = "negative_pct",
        deserialize_with = "de_option_i64_forgiving"
    )]
    pub negative_pct: Option<i64>,
    #[serde(
        default,
        rename = "neutral_percent",
        alias = "neutral_pct",
        deserialize_with = "de_option_i64_forgiving"
    )]
    pub neutral_pct: Option<i64>,
}

impl Stats {
    pub fn is_complete(&self) -> bool {
        self.positive_pct.is_some() && self.negative_pct.is_some() && self.neutral_pct.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.positive_pct.is_none() && self.negative_pct.is_none() && self.neutral_pct.is_none()
    }

    /// `round(100 * count / total)` per class, ties to even. Independent rounding
    /// means the three values may not add up to 100.
    pub fn approximate_from(segments: &[Segment]) -> Self {
        if segments.is_empty() {
            return Self::default();
        }
        let total = segments.len() as f64;
        let pct = |class: Sentiment| {
            let count = segments.iter().filter(|s| s.sentiment() == class).count();
            Some((100.0 * count as f64 / total).round_ties_even() as i64)
        };
        Self {
            positive_pct: pct(Sentiment::Positive),
            negative_pct: pct(Sentiment::Negative),
            neutral_pct: pct(Sentiment::Neutral),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetMention {
    #[serde(default, deserialize_with = "de_option_i64_forgiving")]
    pub segment_index: Option<i64>,
    #[serde(default, deserialize_with = "de_string_lenient")]
    pub text: String,
    #[serde(default, deserialize_with = "de_string_lenient")]
    pub target: String,
    #[serde(default, deserialize_with = "de_option_string_lenient")]
    pub reason: Option<String>,
    #[serde(
        default,
        rename = "certainty_percent",
        alias = "certainty_pct",
        deserialize_with = "de_option_i64_forgiving"
    )]
    pub certainty_pct: Option<i64>,
}

impl TargetMention {
    pub fn target_or_unknown(&self) -> &str {
        let target = self.target.trim();
        if target.is_empty() { UNKNOWN_LABEL } else { target }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub summary: Summary,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub segments: Vec<Segment>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub stats: Stats,
    #[serde(
        default,
        alias = "negative_person_phrases",
        deserialize_with = "de_null_as_default"
    )]
    pub negative_target_mentions: Vec<TargetMention>,
}

/// Header flavour: exact for strictly parsed reports, approximate for recovered ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    Exact,
    Approximate,
}

impl SentimentReport {
    pub fn render(&self, style: RenderStyle) -> String {
        self.render_lines(style).join("\n")
    }

    /// General analysis, then per-segment detail, then negative target mentions.
    /// Absent fields are omitted and entries with blank text are skipped.
    pub fn render_lines(&self, style: RenderStyle) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(match style {
            RenderStyle::Exact => "General analysis:".to_string(),
            RenderStyle::Approximate => "General analysis (approx.):".to_string(),
        });
        if let Some(summary) = non_blank(&self.summary.short_summary) {
            lines.push(format!("- Summary: {}", summary));
        }
        if let Some(global) = non_blank(&self.summary.global_sentiment) {
            lines.push(format!("- Global sentiment: {}", global));
        }
        if !self.stats.is_empty() {
            lines.push("- Approximate percentages:".to_string());
            if let Some(pos) = self.stats.positive_pct {
                lines.push(format!("  - Positive: {}%", pos));
            }
            if let Some(neg) = self.stats.negative_pct {
                lines.push(format!("  - Negative: {}%", neg));
            }
            if let Some(neu) = self.stats.neutral_pct {
                lines.push(format!("  - Neutral: {}%", neu));
            }
        }
        if let Some(judgment) = non_blank(&self.summary.final_judgment) {
            lines.push(format!("- Final judgment: {}", judgment));
        }

        if !self.segments.is_empty() {
            lines.push(String::new());
            lines.push("Per-segment detail:".to_string());
            for seg in &self.segments {
                let text = seg.text.trim();
                if text.is_empty() {
                    continue;
                }
                let sentiment = seg.sentiment.trim();
                lines.push(format!(
                    "- Segment {}: \"{}\" | Sentiment: {}",
                    display_index(seg.index),
                    text,
                    if sentiment.is_empty() { UNKNOWN_LABEL } else { sentiment }
                ));
            }
        }

        if !self.negative_target_mentions.is_empty() {
            lines.push(String::new());
            lines.push("Negative mentions of a person:".to_string());
            for mention in &self.negative_target_mentions {
                let text = mention.text.trim();
                if text.is_empty() {
                    continue;
                }
                let mut parts = vec![
                    format!("Segment {}: \"{}\"", display_index(mention.segment_index), text),
                    format!("Target: {}", mention.target_or_unknown()),
                ];
                if let Some(reason) = non_blank(&mention.reason) {
                    parts.push(format!("Reason: {}", reason));
                }
                if let Some(cert) = mention.certainty_pct {
                    parts.push(format!("Certainty: {}%", cert));
                }
                lines.push(format!("- {}", parts.join(" | ")));
            }
        }

        lines
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn display_index(index: Option<i64>) -> String {
    index.map_or_else(|| "?".to_string(), |i| i.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: i64, text: &str, sentiment: &str) -> Segment {
        Segment {
            index: Some(index),
            text: text.to_string(),
            sentiment: sentiment.to_string(),
        }
    }

    #[test]
    fn test_classify_labels() {
        assert_eq!(Sentiment::classify("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::classify("positif"), Sentiment::Positive);
        assert_eq!(Sentiment::classify(" NEGATIF "), Sentiment::Negative);
        assert_eq!(Sentiment::classify("négatif"), Sentiment::Negative);
        assert_eq!(Sentiment::classify("neutre"), Sentiment::Neutral);
        assert_eq!(Sentiment::classify("mixte"), Sentiment::Mixed);
        assert_eq!(Sentiment::classify("angry"), Sentiment::Unknown);
        assert_eq!(seg(1, "x", "mixed").sentiment(), Sentiment::Unknown);
    }

    #[test]
    fn test_approximate_two_and_two() {
        let segments = vec![
            seg(1, "a", "positive"),
            seg(2, "b", "negative"),
            seg(3, "c", "Positive"),
            seg(4, "d", "negatif"),
        ];
        let stats = Stats::approximate_from(&segments);
        assert_eq!(stats.positive_pct, Some(50));
        assert_eq!(stats.negative_pct, Some(50));
        assert_eq!(stats.neutral_pct, Some(0));
    }

    #[test]
    fn test_approximate_does_not_force_sum() {
        let segments = vec![
            seg(1, "a", "positive"),
            seg(2, "b", "negative"),
            seg(3, "c", "neutral"),
        ];
        let stats = Stats::approximate_from(&segments);
        assert_eq!(stats.positive_pct, Some(33));
        assert_eq!(stats.negative_pct, Some(33));
        assert_eq!(stats.neutral_pct, Some(33));
    }

    #[test]
    fn test_approximate_rounds_ties_to_even() {
        // 1 of 8 = 12.5% → 12
        let mut segments = vec![seg(1, "a", "positive")];
        segments.extend((2..=8).map(|i| seg(i, "n", "neutral")));
        let stats = Stats::approximate_from(&segments);
        assert_eq!(stats.positive_pct, Some(12));
        assert_eq!(stats.neutral_pct, Some(88));
    }

    #[test]
    fn test_render_full_report() {
        let report = SentimentReport {
            summary: Summary {
                global_sentiment: Some("mixed".to_string()),
                short_summary: Some("Talks about Abdou".to_string()),
                final_judgment: Some("Mostly positive".to_string()),
            },
            segments: vec![seg(1, "driyef bzaf", "positive"), seg(2, "  ", "neutral")],
            stats: Stats {
                positive_pct: Some(60),
                negative_pct: Some(30),
                neutral_pct: Some(10),
            },
            negative_target_mentions: vec![TargetMention {
                segment_index: Some(2),
                text: "f3ayl khaybin".to_string(),
                target: String::new(),
                reason: None,
                certainty_pct: Some(85),
            }],
        };
        let expected = "General analysis:\n\
            - Summary: Talks about Abdou\n\
            - Global sentiment: mixed\n\
            - Approximate percentages:\n  \
            - Positive: 60%\n  \
            - Negative: 30%\n  \
            - Neutral: 10%\n\
            - Final judgment: Mostly positive\n\
            \n\
            Per-segment detail:\n\
            - Segment 1: \"driyef bzaf\" | Sentiment: positive\n\
            \n\
            Negative mentions of a person:\n\
            - Segment 2: \"f3ayl khaybin\" | Target: unknown | Certainty: 85%";
        assert_eq!(report.render(RenderStyle::Exact), expected);
    }

    #[test]
    fn test_render_empty_report_is_header_only() {
        let lines = SentimentReport::default().render_lines(RenderStyle::Approximate);
        assert_eq!(lines, vec!["General analysis (approx.):".to_string()]);
    }

    #[test]
    fn test_deserialize_aliases_and_nulls() {
        let report: SentimentReport = serde_json::from_str(
            r#"{
                "summary": {"global_sentiment": "negatif", "short_french_summary": "resume"},
                "segments": null,
                "stats": {"positive_pct": "20", "negative_percent": 70.2},
                "negative_person_phrases": [
                    {"segment_index": "3", "text": "khayb", "target": "Abdou", "certainty_percent": 90}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(report.summary.short_summary.as_deref(), Some("resume"));
        assert_eq!(
            report.summary.global_sentiment.as_deref().map(Sentiment::classify),
            Some(Sentiment::Negative)
        );
        assert!(report.segments.is_empty());
        assert_eq!(report.stats.positive_pct, Some(20));
        assert_eq!(report.stats.negative_pct, Some(70));
        assert_eq!(report.stats.neutral_pct, None);
        assert_eq!(report.negative_target_mentions[0].segment_index, Some(3));
    }
}
