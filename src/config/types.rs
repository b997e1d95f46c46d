//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/draftsmith/) and project (.draftsmith/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{links, network, retry, validation};
use crate::types::{DraftError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion provider settings
    pub llm: LlmConfig,

    /// Section writing and validation settings
    pub writer: WriterConfig,

    /// Link post-processing settings
    pub links: LinkConfig,

    /// Cover image settings
    pub image: ImageConfig,

    /// Persistence settings
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            writer: WriterConfig::default(),
            links: LinkConfig::default(),
            image: ImageConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DraftError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DraftError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(self.writer.word_tolerance > 0.0 && self.writer.word_tolerance < 1.0) {
            return Err(DraftError::Config(format!(
                "writer.word_tolerance must be in (0, 1), got {}",
                self.writer.word_tolerance
            )));
        }

        if let Some(growth) = self.writer.max_polish_growth
            && growth < 0.0
        {
            return Err(DraftError::Config(format!(
                "writer.max_polish_growth must not be negative, got {}",
                growth
            )));
        }

        if self.links.min_external_sources == 0 {
            return Err(DraftError::Config(
                "links.min_external_sources must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "ollama"
    pub provider: String,

    /// Model name
    pub model: String,

    /// Custom API endpoint (OpenAI-compatible gateways, remote Ollama)
    pub api_base: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature; prose benefits from some variety
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: usize,

    /// Retries for transient completion failures (not word-count retries)
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_base: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            max_tokens: 4096,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Writer Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Accepted deviation from each section's word target
    pub word_tolerance: f64,

    /// Word-count retries per section before accepting with a warning
    pub max_section_retries: u32,

    /// Previously accepted sections passed as transition context
    pub context_sections: usize,

    /// Run the edit-only polish pass
    pub polish: bool,

    /// Reject polish output that grew by more than this fraction.
    /// `None` keeps the polish output unconditionally.
    pub max_polish_growth: Option<f64>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            word_tolerance: validation::WORD_TOLERANCE,
            max_section_retries: validation::MAX_SECTION_RETRIES,
            context_sections: validation::CONTEXT_SECTIONS,
            polish: true,
            max_polish_growth: None,
        }
    }
}

// =============================================================================
// Link Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// External citations required in the final document
    pub min_external_sources: usize,

    /// URL prefix for internal article links
    pub internal_url_prefix: String,

    /// Characters of surrounding text stored with each extracted link
    pub context_window: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            min_external_sources: links::MIN_EXTERNAL_SOURCES,
            internal_url_prefix: links::INTERNAL_URL_PREFIX.to_string(),
            context_window: links::CONTEXT_WINDOW,
        }
    }
}

// =============================================================================
// Image Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Generate a cover image after writing
    pub enabled: bool,

    /// Provider name: "openai" or "none"
    pub provider: String,

    /// Image model
    pub model: String,

    /// Image dimensions, e.g. "1792x1024"
    pub size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            model: "dall-e-3".to_string(),
            size: "1792x1024".to_string(),
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path (relative to the working directory)
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".draftsmith/articles.db"),
        }
    }
}
