//! Article Writer
//!
//! The core of the crate: outline in, finished markdown out.
//!
//! ## Modules
//!
//! - `text`: word counting, em-dash stripping, slugs, excerpts
//! - `validator`: per-section word band and bounded retry policy
//! - `section_writer`: one completion per section attempt
//! - `pipeline`: the state machine driving a full run
//! - `links`: internal allow-list, source citations, link extraction
//! - `assets`: best-effort cover image
//! - `outline`: outline generation and two-tier parsing
//! - `research`: concurrent source gathering

pub mod assets;
pub mod events;
pub mod links;
pub mod outline;
pub mod pipeline;
pub mod prompts;
pub mod research;
pub mod section_writer;
pub mod text;
pub mod validator;

pub use assets::{AssetGenerator, CoverImage};
pub use events::{CancelToken, EventSender, PipelineEvent};
pub use links::{
    build_allowed_internal_links, cited_sources, enforce_internal_allow_list,
    ensure_external_source_links, extract_internal_links,
};
pub use outline::{
    OutlineAgent, ParsedOutline, ParsedTopics, extract_topics, fill_word_targets,
    parse_outline_response,
};
pub use pipeline::{
    PipelineRun, PipelineState, SectionReport, WriterInputs, WriterOutput, WriterPipeline,
    compile_document,
};
pub use research::{
    CompletionSourceSearch, SharedSourceSearch, SourceSearch, gather_sources,
    parse_source_suggestions,
};
pub use section_writer::{GeneratedSection, SectionRequest, SectionWriter};
pub use text::{
    contains_em_dash, count_words, generate_excerpt, generate_slug, reading_time_minutes,
    recommended_paragraphing, strip_em_dash,
};
pub use validator::{SectionState, SectionValidator, Verdict, WordBand};
