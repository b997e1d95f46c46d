//! Section Writer
//!
//! Requests one block of prose for one outline section. No validation
//! happens here; the pipeline hands the result to the validator.

use std::time::Duration;

use tracing::debug;

use crate::ai::metrics::SharedMetrics;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::types::{AllowedInternalLink, Result, Section, SourceRef};

use super::prompts::SectionPromptParams;
use super::text::count_words;
use super::validator::WordBand;

const SYSTEM: &str = "You write one section of a blog article in markdown. \
Follow the word range and rules exactly and output only the section.";

/// Metrics stage name for section completions
pub const STAGE: &str = "write_section";

/// Everything the writer knows about the section being written
#[derive(Debug, Clone)]
pub struct SectionRequest<'a> {
    pub article_title: &'a str,
    pub section: &'a Section,
    pub index: usize,
    pub total_sections: usize,
    /// Most recent accepted sections, oldest first
    pub previous_sections: &'a [String],
    pub allowed_links: &'a [AllowedInternalLink],
    pub sources: &'a [SourceRef],
    pub custom_instructions: Option<&'a str>,
}

/// One attempt at a section, owned by the pipeline until accepted or discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    pub index: usize,
    pub text: String,
    pub word_count: usize,
    /// 0-based retry counter
    pub attempt: u32,
}

pub struct SectionWriter {
    provider: SharedProvider,
    metrics: SharedMetrics,
    timeout: Duration,
    min_sources: usize,
}

impl SectionWriter {
    pub fn new(
        provider: SharedProvider,
        metrics: SharedMetrics,
        timeout: Duration,
        min_sources: usize,
    ) -> Self {
        Self {
            provider,
            metrics,
            timeout,
            min_sources,
        }
    }

    pub async fn write(
        &self,
        request: &SectionRequest<'_>,
        band: WordBand,
        attempt: u32,
    ) -> Result<GeneratedSection> {
        let prompt = SectionPromptParams {
            article_title: request.article_title,
            section: request.section,
            index: request.index,
            total_sections: request.total_sections,
            band,
            previous_sections: request.previous_sections,
            allowed_links: request.allowed_links,
            sources: request.sources,
            min_sources: self.min_sources,
            custom_instructions: request.custom_instructions,
        }
        .build()?;

        let completion = CompletionRequest::new(prompt).with_system(SYSTEM);
        let response = with_timeout(
            self.timeout,
            self.provider.complete(&completion),
            "section completion",
        )
        .await?;
        self.metrics.record(STAGE, &response);

        let text = normalize_section(&response.content, &request.section.heading);
        let word_count = count_words(&text);

        debug!(
            index = request.index,
            attempt,
            word_count,
            band = %band,
            "Section generated"
        );

        Ok(GeneratedSection {
            index: request.index,
            text,
            word_count,
            attempt,
        })
    }
}

/// Trim the completion, unwrap a whole-output code fence and make sure the
/// text opens with its `## heading` line.
pub fn normalize_section(raw: &str, heading: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    let first_line = text.lines().next().unwrap_or("").trim_start();
    if first_line.starts_with("## ") {
        text.to_string()
    } else if let Some(title) = first_line.strip_prefix("# ") {
        let rest = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        format!("## {}\n{}", title.trim(), rest)
    } else {
        format!("## {}\n\n{}", heading.trim(), text)
    }
}
