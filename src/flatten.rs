//! Collapse a scraped payload of unknown shape into a single prompt text.

use serde_json::{Map, Value};

/// Raw content handed over by a scraper plugin. No schema is assumed.
pub type ScrapedPayload = Value;

/// Keys that carry the meaningful text of a page, in the order they are emitted.
pub const PRIORITY_KEYS: [&str; 6] = ["title", "content", "text", "body", "description", "summary"];

/// Nesting below this depth is dropped rather than recursed into.
pub const MAX_DEPTH: usize = 50;

/// Depth-first, newline-joined text of every leaf in `payload`.
///
/// Never fails. Objects that expose any of [`PRIORITY_KEYS`] as non-blank strings
/// contribute only those values, in priority order; otherwise every value is
/// visited in key order.
pub fn flatten(payload: &ScrapedPayload) -> String {
    flatten_at(payload, 0)
}

fn flatten_at(value: &Value, depth: usize) -> String {
    if depth > MAX_DEPTH {
        tracing::debug!("flatten: payload nested deeper than {}, truncating", MAX_DEPTH);
        return String::new();
    }
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => flatten_object(map, depth),
        Value::Array(items) => join_parts(items.iter().map(|item| flatten_at(item, depth + 1))),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

fn flatten_object(map: &Map<String, Value>, depth: usize) -> String {
    let preferred: Vec<String> = PRIORITY_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if !preferred.is_empty() {
        return preferred.join("\n");
    }

    join_parts(map.values().map(|v| flatten_at(v, depth + 1)))
}

fn join_parts<I>(parts: I) -> String
where
    I: Iterator<Item = String>,
{
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
