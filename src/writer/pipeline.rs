//! Writer Pipeline Controller
//!
//! An explicit state machine over one outline:
//!
//! ```text
//! WRITE_SECTION -> VALIDATE -> (WRITE_SECTION | COMPILE) -> POLISH
//!     -> CLEANUP -> GENERATE_ASSETS -> DONE
//! ```
//!
//! Sections are written strictly in outline order because each prompt
//! carries the previously accepted text. Word-count misses are retried a
//! bounded number of times and never fail the run; only completion
//! failures, timeouts and cancellation do.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::ai::image::SharedImageGenerator;
use crate::ai::metrics::{MetricsCollector, MetricsSummary, SharedMetrics};
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::config::Config;
use crate::constants::text as text_constants;
use crate::types::{
    AllowedInternalLink, CandidateArticle, DraftError, InternalLinkRecord, Outline, Result, RunId,
    SourceRef,
};

use super::assets::{AssetGenerator, CoverImage};
use super::events::{CancelToken, EventSender, EventSink, PipelineEvent};
use super::links::{
    build_allowed_internal_links, enforce_internal_allow_list, ensure_external_source_links,
    extract_internal_links,
};
use super::prompts::PolishPromptParams;
use super::section_writer::{GeneratedSection, SectionRequest, SectionWriter};
use super::text::{
    count_words, generate_excerpt, generate_slug, reading_time_minutes, strip_em_dash,
    without_title,
};
use super::validator::{SectionState, SectionValidator};

const POLISH_SYSTEM: &str = "You are a copy editor. You edit, you never add.";

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    WriteSection,
    Validate,
    Compile,
    Polish,
    Cleanup,
    GenerateAssets,
    Done,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WriteSection => "write_section",
            Self::Validate => "validate",
            Self::Compile => "compile",
            Self::Polish => "polish",
            Self::Cleanup => "cleanup",
            Self::GenerateAssets => "generate_assets",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ephemeral state of one run.
///
/// `accepted_sections().len() == current_section_index()` holds whenever no
/// write is in flight.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    current_section_index: usize,
    accepted_sections: Vec<String>,
    retry_count: u32,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_section_index(&self) -> usize {
        self.current_section_index
    }

    pub fn accepted_sections(&self) -> &[String] {
        &self.accepted_sections
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Keep `text` for the current section and move to the next one
    pub fn accept(&mut self, text: String) {
        self.accepted_sections.push(text);
        self.current_section_index += 1;
        self.retry_count = 0;
        debug_assert_eq!(self.accepted_sections.len(), self.current_section_index);
    }

    /// Drop the current attempt; the same section is written again
    pub fn discard(&mut self) {
        self.retry_count += 1;
    }

    /// The last `n` accepted sections, oldest first
    pub fn context(&self, n: usize) -> &[String] {
        let start = self.accepted_sections.len().saturating_sub(n);
        &self.accepted_sections[start..]
    }
}

/// Per-run inputs besides the outline
#[derive(Debug, Clone, Default)]
pub struct WriterInputs {
    /// Published articles the outline's suggested links may resolve to
    pub candidates: Vec<CandidateArticle>,
    /// External citation pool
    pub sources: Vec<SourceRef>,
    pub custom_instructions: Option<String>,
}

/// How one section was accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub index: usize,
    pub heading: String,
    pub word_target: u32,
    pub word_count: usize,
    /// Completion calls spent on this section
    pub attempts: u32,
    pub state: SectionState,
}

impl SectionReport {
    pub fn warning(&self) -> bool {
        self.state == SectionState::AcceptedWithWarning
    }
}

/// Terminal result of a run
#[derive(Debug, Clone)]
pub struct WriterOutput {
    pub run_id: String,
    pub full_document: String,
    pub cover_image: Option<CoverImage>,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub excerpt: String,
    pub slug: String,
    pub sections: Vec<SectionReport>,
    pub allowed_links: Vec<AllowedInternalLink>,
    /// Internal links found in the final document, for persistence
    pub internal_links: Vec<InternalLinkRecord>,
    pub warnings: Vec<String>,
    pub metrics: MetricsSummary,
}

impl WriterOutput {
    /// True if any section was accepted outside its band
    pub fn has_section_warnings(&self) -> bool {
        self.sections.iter().any(SectionReport::warning)
    }
}

/// Join the accepted sections into the fixed article template
pub fn compile_document(outline: &Outline, sections: &[String]) -> String {
    format!(
        "# {}\n\n{}\n\n{}\n\n## Conclusion\n\n{}\n\n{}",
        outline.title.trim(),
        outline.hook.trim(),
        sections.join("\n\n"),
        outline.conclusion.summary.trim(),
        outline.conclusion.call_to_action.trim(),
    )
    .trim_end()
    .to_string()
}

/// Strip `<DRAFT>` tags or a code fence the editor echoed back
fn unwrap_polished(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }
    if let Some(inner) = text
        .strip_prefix("<DRAFT>")
        .and_then(|rest| rest.trim_end().strip_suffix("</DRAFT>"))
    {
        text = inner.trim();
    }
    text
}

/// Drives section writing, validation, composition and post-processing.
///
/// Collaborators are injected; nothing here holds global state, so one
/// pipeline can serve many sequential runs.
pub struct WriterPipeline {
    provider: SharedProvider,
    images: SharedImageGenerator,
    config: Config,
    validator: SectionValidator,
    timeouts: TimeoutConfig,
    cancel: CancelToken,
    events: EventSink,
}

impl WriterPipeline {
    pub fn new(provider: SharedProvider, images: SharedImageGenerator, config: &Config) -> Self {
        Self {
            provider,
            images,
            validator: SectionValidator::from_config(&config.writer),
            timeouts: TimeoutConfig::from_config(config),
            config: config.clone(),
            cancel: CancelToken::new(),
            events: EventSink::default(),
        }
    }

    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn check_cancelled(&self, state: PipelineState) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!(stage = %state, "Run cancelled");
            return Err(DraftError::cancelled(state.name()));
        }
        Ok(())
    }

    #[instrument(skip(self, outline, inputs), fields(title = %outline.title, sections = outline.sections.len()))]
    pub async fn run(&self, outline: &Outline, inputs: &WriterInputs) -> Result<WriterOutput> {
        outline.validate()?;

        let run_id = RunId::generate();
        let metrics: SharedMetrics = Arc::new(MetricsCollector::new(run_id.as_str()));
        let links = &self.config.links;

        let allowed_links = build_allowed_internal_links(
            &outline.suggested_links(),
            &inputs.candidates,
            &links.internal_url_prefix,
        );
        let writer = SectionWriter::new(
            self.provider.clone(),
            metrics.clone(),
            self.timeouts.completion,
            links.min_external_sources,
        );

        info!(
            run_id = %run_id,
            allowed_links = allowed_links.len(),
            sources = inputs.sources.len(),
            "Starting writer pipeline"
        );

        let mut run = PipelineRun::new();
        let mut pending: Option<GeneratedSection> = None;
        let mut reports = Vec::with_capacity(outline.sections.len());
        let mut warnings = Vec::new();
        let mut document = String::new();
        let mut cover_image = None;
        let mut state = PipelineState::WriteSection;

        loop {
            self.events.emit(PipelineEvent::StageEntered { state });

            state = match state {
                PipelineState::WriteSection => {
                    self.check_cancelled(state)?;
                    let index = run.current_section_index();
                    let section = &outline.sections[index];

                    self.events.emit(PipelineEvent::SectionAttempt {
                        index,
                        heading: section.heading.clone(),
                        attempt: run.retry_count(),
                    });

                    let request = SectionRequest {
                        article_title: &outline.title,
                        section,
                        index,
                        total_sections: outline.sections.len(),
                        previous_sections: run.context(self.config.writer.context_sections),
                        allowed_links: &allowed_links,
                        sources: &inputs.sources,
                        custom_instructions: inputs.custom_instructions.as_deref(),
                    };
                    let band = self.validator.band(section.word_target);
                    pending = Some(writer.write(&request, band, run.retry_count()).await?);
                    PipelineState::Validate
                }

                PipelineState::Validate => {
                    let generated = pending.take().ok_or_else(|| {
                        DraftError::pipeline(state.name(), "no generated section to validate")
                    })?;
                    let section = &outline.sections[generated.index];
                    let verdict = self.validator.decide(
                        section.word_target,
                        generated.word_count,
                        run.retry_count(),
                    );

                    match verdict.state {
                        SectionState::Retry => {
                            warn!(
                                index = generated.index,
                                attempt = generated.attempt,
                                word_count = verdict.word_count,
                                band = %verdict.band,
                                "Section outside word band, retrying"
                            );
                            run.discard();
                            PipelineState::WriteSection
                        }
                        SectionState::Valid | SectionState::AcceptedWithWarning => {
                            let warning = verdict.state == SectionState::AcceptedWithWarning;
                            if warning {
                                warn!(
                                    index = generated.index,
                                    word_count = verdict.word_count,
                                    band = %verdict.band,
                                    "Retries exhausted, accepting section outside word band"
                                );
                                warnings.push(format!(
                                    "Section {} '{}' has {} words, outside {} after {} attempts",
                                    generated.index + 1,
                                    section.heading,
                                    verdict.word_count,
                                    verdict.band,
                                    generated.attempt + 1
                                ));
                            } else {
                                debug!(index = generated.index, "Section accepted");
                            }

                            let report = SectionReport {
                                index: generated.index,
                                heading: section.heading.clone(),
                                word_target: section.word_target,
                                word_count: verdict.word_count,
                                attempts: generated.attempt + 1,
                                state: verdict.state,
                            };
                            self.events.emit(PipelineEvent::SectionAccepted {
                                index: report.index,
                                word_count: report.word_count,
                                attempts: report.attempts,
                                warning,
                            });
                            reports.push(report);
                            run.accept(generated.text);

                            if run.current_section_index() < outline.sections.len() {
                                PipelineState::WriteSection
                            } else {
                                PipelineState::Compile
                            }
                        }
                        SectionState::Pending => {
                            return Err(DraftError::pipeline(
                                state.name(),
                                "validator returned a pending verdict",
                            ));
                        }
                    }
                }

                PipelineState::Compile => {
                    document = compile_document(outline, run.accepted_sections());
                    info!(
                        word_count = count_words(&document),
                        target = outline.total_word_target(),
                        "Compiled document"
                    );
                    PipelineState::Polish
                }

                PipelineState::Polish => {
                    if self.config.writer.polish {
                        self.check_cancelled(state)?;
                        document = self.polish(document, &metrics, &mut warnings).await?;
                    } else {
                        debug!("Polish disabled");
                    }
                    PipelineState::Cleanup
                }

                PipelineState::Cleanup => {
                    document = self.cleanup(&document, &allowed_links, &inputs.sources);
                    PipelineState::GenerateAssets
                }

                PipelineState::GenerateAssets => {
                    if self.config.image.enabled {
                        self.check_cancelled(state)?;
                        let assets = AssetGenerator::new(
                            self.provider.clone(),
                            self.images.clone(),
                            metrics.clone(),
                            self.timeouts.completion,
                            self.timeouts.image,
                        );
                        let summary = if outline.conclusion.summary.trim().is_empty() {
                            outline.hook.as_str()
                        } else {
                            outline.conclusion.summary.as_str()
                        };
                        cover_image = assets.generate(&outline.title, summary).await;
                        if cover_image.is_none() {
                            warnings.push("Cover image was not generated".to_string());
                        }
                    } else {
                        self.events.emit(PipelineEvent::AssetsSkipped {
                            reason: "cover images disabled".to_string(),
                        });
                    }
                    PipelineState::Done
                }

                PipelineState::Done => break,
            };
        }

        let word_count = count_words(&document);
        let internal_links = extract_internal_links(
            &document,
            &inputs.candidates,
            &links.internal_url_prefix,
            links.context_window,
        );

        self.events.emit(PipelineEvent::Completed {
            word_count,
            warnings: warnings.len(),
        });
        info!(
            run_id = %run_id,
            word_count,
            api_calls = metrics.api_calls(),
            warnings = warnings.len(),
            "Writer pipeline completed"
        );

        Ok(WriterOutput {
            run_id: run_id.to_string(),
            excerpt: generate_excerpt(without_title(&document), text_constants::DEFAULT_EXCERPT_LEN),
            slug: generate_slug(&outline.title),
            reading_time_minutes: reading_time_minutes(word_count),
            word_count,
            full_document: document,
            cover_image,
            sections: reports,
            allowed_links,
            internal_links,
            warnings,
            metrics: metrics.summary(),
        })
    }

    /// Edit-only pass. Its output replaces the document unless it is empty
    /// or, when a growth limit is configured, longer than allowed.
    async fn polish(
        &self,
        compiled: String,
        metrics: &SharedMetrics,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let word_count = count_words(&compiled);
        let prompt = PolishPromptParams {
            document: &compiled,
            word_count,
        }
        .build()?;

        let request = CompletionRequest::new(prompt).with_system(POLISH_SYSTEM);
        let response = with_timeout(
            self.timeouts.completion,
            self.provider.complete(&request),
            "polish completion",
        )
        .await?;
        metrics.record(PipelineState::Polish.name(), &response);

        let polished = unwrap_polished(&response.content);
        if polished.is_empty() {
            warn!("Polish returned empty output, keeping compiled document");
            warnings.push("Polish pass returned no text".to_string());
            return Ok(compiled);
        }

        let polished_count = count_words(polished);
        if let Some(growth) = self.config.writer.max_polish_growth {
            let limit = word_count as f64 * (1.0 + growth);
            if polished_count as f64 > limit {
                warn!(
                    compiled = word_count,
                    polished = polished_count,
                    "Polish grew the document beyond the limit, discarding"
                );
                warnings.push(format!(
                    "Polish output discarded: {} words vs {} compiled",
                    polished_count, word_count
                ));
                return Ok(compiled);
            }
        }

        debug!(
            compiled = word_count,
            polished = polished_count,
            "Polish applied"
        );
        Ok(polished.to_string())
    }

    /// Deterministic post-processing; em-dash stripping always runs last.
    fn cleanup(
        &self,
        document: &str,
        allowed_links: &[AllowedInternalLink],
        sources: &[SourceRef],
    ) -> String {
        let links = &self.config.links;
        let (document, removed) =
            enforce_internal_allow_list(document, allowed_links, &links.internal_url_prefix);
        if removed > 0 {
            debug!(removed, "Removed internal links outside the allow-list");
        }
        let document = ensure_external_source_links(&document, sources, links.min_external_sources);
        strip_em_dash(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::image::DisabledImageGenerator;
    use crate::ai::provider::mock::ScriptedProvider;
    use crate::types::{Conclusion, Section};
    use regex::Regex;
    use tokio::sync::mpsc;

    fn outline(targets: &[u32]) -> Outline {
        Outline {
            title: "Caching \u{2014} A Primer".to_string(),
            hook: "Slow pages cost readers.".to_string(),
            sections: targets
                .iter()
                .enumerate()
                .map(|(i, t)| Section::new(format!("Part {}", i + 1), *t))
                .collect(),
            conclusion: Conclusion {
                summary: "Cache what you can.".to_string(),
                call_to_action: "Try it today.".to_string(),
            },
            seo_keywords: vec![],
        }
    }

    fn target_of(prompt: &str) -> Option<usize> {
        Regex::new(r"\*\*Word target\*\*: (\d+) words")
            .unwrap()
            .captures(prompt)
            .and_then(|c| c[1].parse().ok())
    }

    /// Sections at `ratio` × target; polish echoes the draft
    fn provider(ratio: f64) -> ScriptedProvider {
        ScriptedProvider::new(move |_, request| {
            if let Some(target) = target_of(&request.prompt) {
                let n = (target as f64 * ratio).round() as usize;
                return Ok(vec!["word"; n].join(" "));
            }
            if let Some(start) = request.prompt.find("<DRAFT>\n") {
                let rest = &request.prompt[start + 8..];
                let end = rest.find("\n</DRAFT>").unwrap_or(rest.len());
                return Ok(rest[..end].to_string());
            }
            Ok("A cover scene".to_string())
        })
    }

    fn config(images: bool) -> Config {
        let mut config = Config::default();
        config.image.enabled = images;
        config
    }

    #[test]
    fn test_pipeline_run_invariant() {
        let mut run = PipelineRun::new();
        run.discard();
        run.discard();
        assert_eq!(run.retry_count(), 2);
        assert_eq!(run.accepted_sections().len(), run.current_section_index());

        run.accept("a".into());
        run.accept("b".into());
        run.accept("c".into());
        assert_eq!(run.retry_count(), 0);
        assert_eq!(run.current_section_index(), 3);
        assert_eq!(run.context(2), ["b".to_string(), "c".to_string()]);
        assert_eq!(run.context(10).len(), 3);
    }

    #[test]
    fn test_compile_template() {
        let outline = outline(&[10, 10]);
        let doc = compile_document(&outline, &["## A\n\nx".into(), "## B\n\ny".into()]);
        assert_eq!(
            doc,
            "# Caching \u{2014} A Primer\n\nSlow pages cost readers.\n\n## A\n\nx\n\n## B\n\ny\n\n\
             ## Conclusion\n\nCache what you can.\n\nTry it today."
        );
    }

    #[test]
    fn test_unwrap_polished() {
        assert_eq!(unwrap_polished("<DRAFT>\n# T\n</DRAFT>"), "# T");
        assert_eq!(unwrap_polished("```markdown\n# T\n```"), "# T");
        assert_eq!(unwrap_polished("  # T  "), "# T");
    }

    #[tokio::test]
    async fn test_run_exact_targets() {
        let provider = Arc::new(provider(1.0));
        let pipeline = WriterPipeline::new(
            provider.clone(),
            Arc::new(DisabledImageGenerator),
            &config(false),
        )
        .with_timeouts(TimeoutConfig::fast());

        let output = pipeline
            .run(&outline(&[100, 200, 150]), &WriterInputs::default())
            .await
            .unwrap();

        assert_eq!(output.sections.len(), 3);
        assert!(output.sections.iter().all(|s| s.attempts == 1));
        assert!(!output.has_section_warnings());
        // three sections plus polish
        assert_eq!(provider.calls(), 4);
        assert!(!output.full_document.contains('\u{2014}'));
        assert!(output.full_document.starts_with("# Caching, A Primer"));
        assert_eq!(output.slug, "caching-a-primer");
        assert_eq!(output.metrics.stage_calls("write_section"), 3);
        assert_eq!(output.reading_time_minutes, 3);
    }

    #[tokio::test]
    async fn test_events_follow_state_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = WriterPipeline::new(
            Arc::new(provider(1.0)),
            Arc::new(DisabledImageGenerator),
            &config(false),
        )
        .with_events(tx);

        pipeline
            .run(&outline(&[50]), &WriterInputs::default())
            .await
            .unwrap();

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::StageEntered { state } = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![
                PipelineState::WriteSection,
                PipelineState::Validate,
                PipelineState::Compile,
                PipelineState::Polish,
                PipelineState::Cleanup,
                PipelineState::GenerateAssets,
                PipelineState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_polish_growth_limit() {
        let mut config = config(false);
        config.writer.max_polish_growth = Some(0.05);
        let provider = ScriptedProvider::new(|_, request| {
            Ok(match target_of(&request.prompt) {
                Some(target) => vec!["word"; target].join(" "),
                None => format!("# Padded\n\n{}", vec!["extra"; 500].join(" ")),
            })
        });
        let pipeline = WriterPipeline::new(
            Arc::new(provider),
            Arc::new(DisabledImageGenerator),
            &config,
        );

        let output = pipeline
            .run(&outline(&[100]), &WriterInputs::default())
            .await
            .unwrap();
        assert!(!output.full_document.contains("extra"));
        assert!(output.warnings.iter().any(|w| w.contains("Polish output discarded")));
    }

    #[tokio::test]
    async fn test_invalid_outline_rejected() {
        let pipeline = WriterPipeline::new(
            Arc::new(provider(1.0)),
            Arc::new(DisabledImageGenerator),
            &config(false),
        );
        let err = pipeline
            .run(&outline(&[]), &WriterInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Validation(_)));
    }
}
