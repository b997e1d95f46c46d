pub mod error;
pub mod links;
pub mod outline;
pub mod utils;

pub use error::{
    DraftError, ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt, ValidationError,
};
pub use links::{AllowedInternalLink, CandidateArticle, InternalLinkRecord, SourceRef};
pub use outline::{Conclusion, Outline, Section, SuggestedLink};
pub use utils::{json_string, json_string_array, json_string_or, json_u64, truncate_chars};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for pipeline run IDs
///
/// Prevents accidental mixing of run IDs with article IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
