//! Behavioural properties of flattening and the extraction chain.

use serde_json::json;

use media_monitor::extractor::{extract, Stats, Tier};
use media_monitor::flatten::flatten;

#[test]
fn test_flatten_is_total_on_mixed_input() {
    let payload = json!([null, 1.5, true, [], {}, {"nested": [{"body": " b "}, "tail"]}]);
    assert_eq!(flatten(&payload), "1.5\ntrue\nb\ntail");
    assert_eq!(flatten(&json!(null)), "");
}

#[test]
fn test_flatten_priority_ignores_insertion_order() {
    let a = json!({"irrelevant": "x", "content": "y"});
    let b = json!({"content": "y", "irrelevant": "x"});
    assert_eq!(flatten(&a), "y");
    assert_eq!(flatten(&a), flatten(&b));
}

#[test]
fn test_strict_report_lines() {
    let raw = json!({
        "summary": {"global_sentiment": "mixed"},
        "segments": [
            {"index": 1, "text": "a", "sentiment": "positive"},
            {"index": 2, "text": "b", "sentiment": "negative"}
        ],
        "stats": {"positive_percent": 60, "negative_percent": 30, "neutral_percent": 10}
    })
    .to_string();
    let extraction = extract(&raw);
    assert_eq!(extraction.tier, Tier::Strict);
    let lines: Vec<&str> = extraction.text.lines().collect();
    assert!(lines.contains(&"  - Positive: 60%"));
    assert!(lines.contains(&"  - Negative: 30%"));
    assert!(lines.contains(&"  - Neutral: 10%"));
    let seg1 = lines.iter().position(|l| l.starts_with("- Segment 1:")).unwrap();
    let seg2 = lines.iter().position(|l| l.starts_with("- Segment 2:")).unwrap();
    assert!(seg1 < seg2);
}

#[test]
fn test_fragments_inside_prose_are_recovered() {
    let raw = r#"Sure! Here is my analysis.
        First: {"index": 1, "text": "bravo", "sentiment": "positif"} and also
        {"index": 2, "text": "c'est nul", "sentiment": "négatif"}
        That's all."#;
    let extraction = extract(raw);
    assert_eq!(extraction.tier, Tier::Recovered);
    let report = extraction.report.unwrap();
    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.stats.positive_pct, Some(50));
    assert_eq!(report.stats.negative_pct, Some(50));
    assert!(extraction.text.contains("- Segment 2: \"c'est nul\" | Sentiment: négatif"));
}

#[test]
fn test_percentage_approximation_two_and_two() {
    let raw = r#"{"index": 1, "text": "a", "sentiment": "positive"},
                 {"index": 2, "text": "b", "sentiment": "positive"},
                 {"index": 3, "text": "c", "sentiment": "negative"},
                 {"index": 4, "text": "d", "sentiment": "negative"}"#;
    let report = extract(raw).report.unwrap();
    assert_eq!(
        report.stats,
        Stats {
            positive_pct: Some(50),
            negative_pct: Some(50),
            neutral_pct: Some(0),
        }
    );
}

#[test]
fn test_unstructured_response_passes_through() {
    let raw = "Le texte est globalement positif.";
    let extraction = extract(raw);
    assert_eq!(extraction.tier, Tier::Passthrough);
    assert_eq!(extraction.text, raw);
}

#[test]
fn test_extraction_is_deterministic() {
    let raw = r#"{"global_sentiment": "neutral", "short_summary": "s""#;
    assert_eq!(extract(raw).text, extract(raw).text);
}
