//! Prompts sent to the generation service.
//!
//! The sentiment prompt pins the JSON shape that [`crate::extractor`] parses in its
//! strict tier; key names here and the extractor's field names must move together.

/// Faithful translation of Moroccan Arabic (Darija) text into `target_language`.
pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "You are a professional translator specialized in Moroccan Arabic (Darija).\n\
         Provide a faithful, natural-sounding translation of the following text \
         into {target_language}. Keep the original tone and do not add commentary.\n\n\
         Text: {text}\nTranslation:"
    )
}

const SENTIMENT_SCHEMA: &str = r#"{
  "summary": {
    "global_sentiment": "positive" | "negative" | "neutral" | "mixed",
    "short_summary": "...",
    "final_judgment": "..."
  },
  "segments": [
    {
      "index": 1,
      "text": "...",  // exact phrase as written in the input
      "sentiment": "positive" | "negative" | "neutral"
    }
    // ... more segments
  ],
  "stats": {
    "positive_percent": 40,
    "negative_percent": 30,
    "neutral_percent": 30
  },
  "negative_target_mentions": [
    {
      "segment_index": 2,
      "text": "...",  // exact phrase as written in the input
      "target": "Abdou" | "he" | "she" | "someone" | "unknown",
      "reason": "...",
      "certainty_percent": 85
    }
    // ... more mentions
  ]
}"#;

/// Strict-JSON sentiment analysis request for (possibly very long) Darija text.
pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "You are an expert in sentiment analysis for Moroccan Arabic (Darija).\n\
         You will be given a text (sometimes very long). Your task is to produce \
         ONLY a valid JSON object describing its sentiment.\n\n\
         The JSON must have exactly this general structure:\n\
         {SENTIMENT_SCHEMA}\n\n\
         - The percentages in \"stats\" must be approximate integers whose sum is close to 100.\n\
         - Keep explanations as short as possible while staying clear.\n\
         - Return NO explanation outside the JSON (no text before or after).\n\
         - Do not write JSON comments (lines with // are examples only).\n\
         - Respect the key names and casing exactly.\n\n\
         Darija text to analyze:\n\
         {text}"
    )
}
