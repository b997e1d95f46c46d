//! Shared utility functions.
//!
//! ## JSON Extraction Helpers
//!
//! Ergonomic helpers for pulling loosely-typed fields out of LLM JSON,
//! where the model may use either camelCase or snake_case keys.

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract a string by the first key that is present.
#[inline]
pub fn json_string(value: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key)?.as_str().map(String::from))
}

/// Extract a string, falling back to a default.
#[inline]
pub fn json_string_or(value: &serde_json::Value, keys: &[&str], default: &str) -> String {
    json_string(value, keys).unwrap_or_else(|| default.to_string())
}

/// Extract a string array by the first key that is present.
///
/// Non-string items are skipped.
pub fn json_string_array(value: &serde_json::Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| value.get(*key)?.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Extract an unsigned integer; numeric strings ("200") are accepted.
pub fn json_u64(value: &serde_json::Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let v = value.get(*key)?;
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .or_else(|| v.as_str()?.trim().parse().ok())
    })
}

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
