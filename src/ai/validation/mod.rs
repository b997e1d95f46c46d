//! Completion Output Parsing
//!
//! Two-tier parsing for structured output: strict JSON first, repaired JSON
//! second. Callers that fall back further (markdown or line heuristics)
//! mark the result [`ParseProvenance::Heuristic`] so consumers can tell a
//! degraded parse from a clean one.

mod json_repair;

pub use json_repair::{JsonRepairer, extract_json_from_response};

use serde::{Deserialize, Serialize};

/// How a structured value was recovered from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseProvenance {
    /// Parsed as-is (code fences aside)
    Strict,
    /// Parsed after JSON repair or extraction from prose
    Repaired,
    /// JSON failed; recovered by a best-effort text heuristic
    Heuristic,
}

impl ParseProvenance {
    /// True when the value did not come from well-formed JSON
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Heuristic)
    }
}

impl std::fmt::Display for ParseProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Repaired => write!(f, "repaired"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded() {
        assert!(!ParseProvenance::Strict.is_degraded());
        assert!(!ParseProvenance::Repaired.is_degraded());
        assert!(ParseProvenance::Heuristic.is_degraded());
        assert_eq!(ParseProvenance::Heuristic.to_string(), "heuristic");
    }
}
