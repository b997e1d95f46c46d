//! Section word-count validation.
//!
//! Each generated section is checked against a tolerance band around its
//! word target. Out-of-band text is retried a bounded number of times and
//! then accepted with a warning, so the writing phase always terminates
//! after at most `(max_retries + 1) × sections` completion calls.

use serde::Serialize;

use super::text::count_words;
use crate::config::WriterConfig;
use crate::constants::validation;

/// Guards against `100 * 1.1 == 110.00000000000001` style drift.
const BAND_EPSILON: f64 = 1e-9;

/// Inclusive word-count range accepted for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WordBand {
    pub min: usize,
    pub max: usize,
}

impl WordBand {
    /// `floor(target × (1 - tolerance)) ..= ceil(target × (1 + tolerance))`
    pub fn for_target(word_target: u32, tolerance: f64) -> Self {
        let target = word_target as f64;
        let min = (target * (1.0 - tolerance) + BAND_EPSILON).floor();
        let max = (target * (1.0 + tolerance) - BAND_EPSILON).ceil();
        Self {
            min: min.max(0.0) as usize,
            max: max.max(0.0) as usize,
        }
    }

    pub fn contains(&self, word_count: usize) -> bool {
        (self.min..=self.max).contains(&word_count)
    }
}

impl std::fmt::Display for WordBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Validation state of the section currently being written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionState {
    /// Generated, not yet checked
    Pending,
    /// Inside the band; accept and advance
    Valid,
    /// Outside the band with retries left; discard and rewrite
    Retry,
    /// Outside the band, retries exhausted; accept anyway and warn
    AcceptedWithWarning,
}

impl SectionState {
    /// Whether the text is kept and the pipeline advances
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Valid | Self::AcceptedWithWarning)
    }
}

/// Result of validating one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub state: SectionState,
    pub word_count: usize,
    pub band: WordBand,
}

/// Applies the band and the retry bound
#[derive(Debug, Clone)]
pub struct SectionValidator {
    tolerance: f64,
    max_retries: u32,
}

impl Default for SectionValidator {
    fn default() -> Self {
        Self {
            tolerance: validation::WORD_TOLERANCE,
            max_retries: validation::MAX_SECTION_RETRIES,
        }
    }
}

impl SectionValidator {
    pub fn new(tolerance: f64, max_retries: u32) -> Self {
        Self {
            tolerance,
            max_retries,
        }
    }

    pub fn from_config(config: &WriterConfig) -> Self {
        Self::new(config.word_tolerance, config.max_section_retries)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn band(&self, word_target: u32) -> WordBand {
        WordBand::for_target(word_target, self.tolerance)
    }

    /// Decide from a precomputed word count.
    ///
    /// `retry_count` is the number of retries already spent on this section.
    pub fn decide(&self, word_target: u32, word_count: usize, retry_count: u32) -> Verdict {
        let band = self.band(word_target);
        let state = if band.contains(word_count) {
            SectionState::Valid
        } else if retry_count < self.max_retries {
            SectionState::Retry
        } else {
            SectionState::AcceptedWithWarning
        };

        Verdict {
            state,
            word_count,
            band,
        }
    }

    pub fn validate(&self, word_target: u32, text: &str, retry_count: u32) -> Verdict {
        self.decide(word_target, count_words(text), retry_count)
    }
}
