//! Text helpers for log previews

/// First `max` characters of `s`, with an ellipsis when something was cut.
/// Counts chars, not bytes, so multi-byte text never splits mid-codepoint.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
