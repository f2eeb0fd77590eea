use serde_json::Value;

/// Renders a loose metadata value as the string a user would have typed.
///
/// Strings pass through unquoted; everything else is rendered as compact
/// JSON, so arrays keep the surrounding brackets that the bracket-stripping
/// helpers below look for.
pub fn loose_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Removes one layer of square brackets left over from stringifying a list.
///
/// Only the leading bracket is checked; the final character is removed
/// unconditionally when it fires.
pub fn strip_bracket_layer(s: &str) -> String {
    if s.starts_with('[') {
        let mut stripped = s[1..].to_string();
        stripped.pop();
        stripped
    } else {
        s.to_string()
    }
}

/// Removes enclosing brackets only when both ends carry them.
pub fn strip_enclosing_brackets(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('[') && s.ends_with(']') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Truncates to at most `max` characters, on character boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}
