//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Section word-count validation constants
pub mod validation {
    /// Accepted deviation from a section's word target (±10%)
    pub const WORD_TOLERANCE: f64 = 0.10;

    /// Retries allowed per section before the text is accepted with a warning
    pub const MAX_SECTION_RETRIES: u32 = 2;

    /// Accepted sections handed to the writer as transition context
    pub const CONTEXT_SECTIONS: usize = 2;
}

/// Paragraph planning bands used only to instruct the completion client
pub mod paragraphing {
    /// Upper bound (inclusive) of each word-target band and its paragraph count
    pub const BANDS: &[(u32, u32)] = &[(150, 2), (250, 3), (350, 4), (450, 5)];

    /// Words per paragraph used above the last band
    pub const WORDS_PER_PARAGRAPH_LARGE: u32 = 90;
}

/// Text normalization constants
pub mod text {
    /// Maximum slug length in characters
    pub const MAX_SLUG_LEN: usize = 100;

    /// Default excerpt length in characters
    pub const DEFAULT_EXCERPT_LEN: usize = 160;

    /// Reading speed used for reading-time estimates (words per minute)
    pub const READING_WORDS_PER_MINUTE: usize = 200;

    /// Replacement for every em dash form
    pub const EM_DASH_REPLACEMENT: &str = ", ";
}

/// Link post-processing constants
pub mod links {
    /// Minimum external citations required in a finished document
    pub const MIN_EXTERNAL_SOURCES: usize = 2;

    /// URL prefix for internal article links
    pub const INTERNAL_URL_PREFIX: &str = "/blog/";

    /// Legacy URL prefix still recognized when extracting links
    pub const LEGACY_URL_PREFIX: &str = "/articles/";

    /// Characters captured on each side of an extracted link
    pub const CONTEXT_WINDOW: usize = 100;

    /// Heading of the appended citation section
    pub const SOURCES_HEADING: &str = "## Sources";
}

/// Outline generation constants
pub mod outline {
    /// Default total word budget for an article
    pub const DEFAULT_WORD_BUDGET: u32 = 1500;

    /// Lowest word target assigned to a section when the budget is split
    pub const MIN_SECTION_WORDS: u32 = 50;
}

/// Source research constants
pub mod research {
    /// Per-query timeout (seconds)
    pub const QUERY_TIMEOUT_SECS: u64 = 15;

    /// Concurrent search queries
    pub const MAX_CONCURRENCY: usize = 4;

    /// References kept per query
    pub const RESULTS_PER_QUERY: usize = 3;
}

/// Caller-level retry constants for transient completion failures
pub mod retry {
    /// Maximum retries per completion call
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Timeout for image generation requests (seconds)
    pub const IMAGE_TIMEOUT_SECS: u64 = 90;
}
