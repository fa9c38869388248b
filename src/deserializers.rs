//! Custom deserializers for the loosely-typed JSON the generation service returns.
//!
//! The service is asked for integers and strings but routinely answers with
//! `"85"`, `85.0`, `null` or a bare number where text was requested. These
//! deserializers accept those spellings so a structurally sound report does not
//! fall through to pattern recovery over a cosmetic type mismatch.

use serde::{Deserialize, Deserializer};

/// Deserializes an optional integer from a number, a numeric string or null.
///
/// # Accepted Formats
///
/// * **Integer**: `85`
/// * **Float**: `85.4` → 85 (rounded)
/// * **String numeric**: `"85"`, `" 85 "`, `"85%"` → 85
/// * **Null / empty string**: `None`
///
/// # Errors
///
/// Returns an error for booleans, arrays, objects, non-finite values and strings
/// that are not numbers.
pub fn de_option_i64_forgiving<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            let f = n
                .as_f64()
                .ok_or_else(|| D::Error::custom("invalid numeric value"))?;
            if !f.is_finite() {
                return Err(D::Error::custom("non-finite numeric value"));
            }
            Ok(Some(f.round() as i64))
        }
        serde_json::Value::String(s) => {
            let s = s.trim().trim_end_matches('%').trim();
            if s.is_empty() {
                return Ok(None);
            }
            let val: f64 = s
                .parse()
                .map_err(|_| D::Error::custom(format!("expected a number, got '{}'", s)))?;
            if !val.is_finite() {
                return Err(D::Error::custom("non-finite numeric value"));
            }
            Ok(Some(val.round() as i64))
        }
        other => Err(D::Error::custom(format!("invalid type for integer: {}", other))),
    }
}

/// Deserializes a string field that may be null or a scalar of another type.
///
/// * `null` → `""`
/// * numbers and booleans → their textual form
/// * arrays / objects → error
pub fn de_string_lenient<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!("invalid type for text: {}", other))),
    }
}

/// Like [`de_string_lenient`] but maps null and blank strings to `None`.
pub fn de_option_string_lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = de_string_lenient(deserializer)?;
    if s.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(s))
    }
}

/// Treats an explicit `null` the same as a missing field: `T::default()`.
pub fn de_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "de_option_i64_forgiving")]
        pct: Option<i64>,
        #[serde(default, deserialize_with = "de_string_lenient")]
        text: String,
        #[serde(default, deserialize_with = "de_option_string_lenient")]
        reason: Option<String>,
    }

    #[test]
    fn test_forgiving_integer_formats() {
        let cases = [
            (r#"{"pct": 85}"#, Some(85)),
            (r#"{"pct": 85.6}"#, Some(86)),
            (r#"{"pct": "40"}"#, Some(40)),
            (r#"{"pct": " 30% "}"#, Some(30)),
            (r#"{"pct": null}"#, None),
            (r#"{"pct": ""}"#, None),
            (r#"{}"#, None),
        ];
        for (json, expected) in cases {
            let sample: Sample = serde_json::from_str(json).unwrap();
            assert_eq!(sample.pct, expected, "input: {}", json);
        }
    }

    #[test]
    fn test_forgiving_integer_rejects_words() {
        assert!(serde_json::from_str::<Sample>(r#"{"pct": "high"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"pct": true}"#).is_err());
    }

    #[test]
    fn test_lenient_strings() {
        let sample: Sample = serde_json::from_str(r#"{"text": null, "reason": "  "}"#).unwrap();
        assert_eq!(sample.text, "");
        assert_eq!(sample.reason, None);

        let sample: Sample = serde_json::from_str(r#"{"text": 12, "reason": "rude"}"#).unwrap();
        assert_eq!(sample.text, "12");
        assert_eq!(sample.reason.as_deref(), Some("rude"));

        assert!(serde_json::from_str::<Sample>(r#"{"text": ["a"]}"#).is_err());
    }
}
