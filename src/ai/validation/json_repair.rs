//! JSON Repair Mechanism
//!
//! JSON extraction and repair for completion output.
//!
//! Handles the usual ways models break JSON:
//! - Markdown code fence wrapping (```json ... ```)
//! - Missing closing braces/brackets
//! - Trailing commas
//! - Truncated strings
//! - Control characters in strings
//! - JSON embedded in explanatory text

use serde_json::Value;
use tracing::{debug, warn};

use super::ParseProvenance;
use crate::types::{DraftError, Result, truncate_chars};

/// Parse JSON out of a completion, repairing if needed.
pub fn extract_json_from_response(content: &str) -> Result<(Value, ParseProvenance)> {
    JsonRepairer::new().parse_or_repair(content)
}

/// JSON repair strategies
pub struct JsonRepairer {
    max_repair_attempts: usize,
}

impl Default for JsonRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self {
            max_repair_attempts: 3,
        }
    }

    /// Strict parse first, then increasingly aggressive repairs.
    ///
    /// Returns [`ParseProvenance::Strict`] when no repair was needed.
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, ParseProvenance)> {
        let cleaned = preprocess(raw);

        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, ParseProvenance::Strict));
        }

        debug!("Initial JSON parse failed, attempting repair");

        for level in 1..=self.max_repair_attempts {
            let repaired = repair_attempt(&cleaned, level);
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                warn!("JSON repaired at level {}", level);
                return Ok((value, ParseProvenance::Repaired));
            }
        }

        if let Some(extracted) = extract_json_from_mixed(&cleaned) {
            let candidates = [extracted.clone(), repair_attempt(&extracted, 1)];
            if let Some(value) = candidates
                .iter()
                .find_map(|c| serde_json::from_str::<Value>(c).ok())
            {
                warn!("JSON extracted from mixed content");
                return Ok((value, ParseProvenance::Repaired));
            }
        }

        Err(DraftError::parse(
            "completion",
            format!(
                "no parseable JSON after {} repair levels; preview: {}...",
                self.max_repair_attempts,
                truncate_chars(&cleaned, 200)
            ),
        ))
    }
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}');
    strip_code_fences(s).trim().to_string()
}

fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }

    result
}

fn repair_attempt(s: &str, level: usize) -> String {
    match level {
        1 => balance_brackets(&fix_trailing_commas(s)),
        2 => balance_brackets(&fix_truncated_strings(&fix_trailing_commas(s))),
        _ => {
            let cleaned = remove_control_chars(&fix_trailing_commas(s));
            truncate_to_valid(&balance_brackets(&fix_truncated_strings(&cleaned)))
        }
    }
}

/// Tracks string/escape state while walking JSON text.
#[derive(Default)]
struct Scanner {
    in_string: bool,
    escape: bool,
}

impl Scanner {
    /// Returns true when `ch` is structural (outside any string).
    fn structural(&mut self, ch: char) -> bool {
        if self.escape {
            self.escape = false;
            return false;
        }
        match ch {
            '\\' if self.in_string => {
                self.escape = true;
                false
            }
            '"' => {
                self.in_string = !self.in_string;
                false
            }
            _ => !self.in_string,
        }
    }
}

/// Drop commas directly before `]` or `}` (outside strings)
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut scanner = Scanner::default();

    for (i, &ch) in chars.iter().enumerate() {
        if scanner.structural(ch) && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}

/// Close an open string and any unclosed containers, innermost first
fn balance_brackets(s: &str) -> String {
    let mut stack = Vec::new();
    let mut scanner = Scanner::default();

    for ch in s.chars() {
        if !scanner.structural(ch) {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut result = s.to_string();
    if scanner.in_string {
        result.push('"');
    }
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

/// Close strings that run into a newline
fn fix_truncated_strings(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    let mut scanner = Scanner::default();

    for ch in s.chars() {
        if matches!(ch, '\n' | '\r') && scanner.in_string && !scanner.escape {
            result.push('"');
            scanner.in_string = false;
            result.push(ch);
            continue;
        }
        scanner.structural(ch);
        result.push(ch);
    }

    if scanner.in_string {
        result.push('"');
    }
    result
}

fn remove_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Cut trailing garbage after the last complete top-level value
fn truncate_to_valid(s: &str) -> String {
    let mut depth = 0i32;
    let mut last_valid = 0;
    let mut scanner = Scanner::default();

    for (i, ch) in s.char_indices() {
        if !scanner.structural(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    last_valid = i + 1;
                }
            }
            _ => {}
        }
    }

    if last_valid > 0 && last_valid < s.len() {
        s[..last_valid].to_string()
    } else {
        s.to_string()
    }
}

/// Pull the first balanced object/array out of surrounding prose
fn extract_json_from_mixed(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let mut depth = 0i32;
    let mut scanner = Scanner::default();

    for (i, ch) in s[start..].char_indices() {
        if !scanner.structural(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    // Unterminated: hand back the tail for bracket balancing
    Some(s[start..].to_string())
}
