//! Draftsmith - Section-by-Section Article Writer
//!
//! Turns a structured outline into a finished markdown article. Each section
//! is written by a completion client, checked against its word target and
//! retried a bounded number of times; the compiled article is polished,
//! cleaned of unapproved links and em dashes, cited, and given a cover
//! image when one can be made.
//!
//! ## Quick Start
//!
//! ```ignore
//! use draftsmith::{Config, WriterInputs, WriterPipeline};
//! use draftsmith::ai::{create_image_generator, create_provider, ProviderConfig};
//!
//! let config = Config::default();
//! let provider = create_provider(&ProviderConfig::from(&config.llm))?;
//! let images = create_image_generator(&config.image, None)?;
//! let pipeline = WriterPipeline::new(provider, images, &config);
//! let output = pipeline.run(&outline, &WriterInputs::default()).await?;
//! println!("{}", output.full_document);
//! ```
//!
//! ## Modules
//!
//! - [`writer`]: text normalization, section validation, the pipeline state machine
//! - [`ai`]: completion and image collaborators, prompts, JSON repair, metrics
//! - [`storage`]: SQLite persistence for articles and internal links
//! - [`config`]: layered configuration
//! - [`types`]: outline model, link types, errors

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod storage;
pub mod types;
pub mod writer;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{DraftError, ErrorCategory, Result, ResultExt};
pub use types::{
    AllowedInternalLink, CandidateArticle, Conclusion, InternalLinkRecord, Outline, Section,
    SourceRef, SuggestedLink,
};

pub use storage::{ArticleStatus, ArticleStore, Database, NewArticle, SharedDatabase};

// =============================================================================
// Writer Re-exports
// =============================================================================

pub use writer::{
    CancelToken, PipelineEvent, PipelineState, SectionReport, WriterInputs, WriterOutput,
    WriterPipeline,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    ImageGenerator, LlmProvider, LlmResponse, MetricsCollector, SharedImageGenerator,
    SharedProvider, TimeoutConfig, with_timeout,
};
