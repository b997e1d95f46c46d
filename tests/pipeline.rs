//! End-to-end runs of the writer pipeline against scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::mpsc;

use draftsmith::ai::{CompletionRequest, ImageResult, TimeoutConfig};
use draftsmith::types::SuggestedLink;
use draftsmith::writer::{SectionState, contains_em_dash, count_words};
use draftsmith::{
    CancelToken, CandidateArticle, Conclusion, Config, DraftError, ImageGenerator, LlmProvider,
    LlmResponse, Outline, PipelineEvent, Result, Section, SourceRef, WriterInputs, WriterPipeline,
};

static WORD_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Word target\*\*: (\d+) words").unwrap());

type Responder = dyn Fn(usize, &CompletionRequest) -> Result<String> + Send + Sync;

/// Completion client answering from a closure of `(call_index, request)`
struct MockProvider {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(
        responder: impl Fn(usize, &CompletionRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(index, request).map(LlmResponse::content_only)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

enum ImageBehavior {
    Succeed,
    Empty,
    Fail,
}

struct MockImages(ImageBehavior);

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate_image(&self, _prompt: &str) -> Result<ImageResult> {
        match self.0 {
            ImageBehavior::Succeed => Ok(ImageResult::from_base64("iVBORw0KGgo=".to_string())),
            ImageBehavior::Empty => Ok(ImageResult::failed()),
            ImageBehavior::Fail => Err(DraftError::LlmApi("image service unavailable".into())),
        }
    }

    fn name(&self) -> &str {
        "mock-images"
    }
}

fn word_target(prompt: &str) -> Option<usize> {
    WORD_TARGET
        .captures(prompt)
        .and_then(|c| c[1].parse().ok())
}

/// Body between the polish prompt's draft markers
fn draft_of(prompt: &str) -> Option<String> {
    let start = prompt.find("<DRAFT>\n")? + "<DRAFT>\n".len();
    let rest = &prompt[start..];
    let end = rest.find("\n</DRAFT>").unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Sections of `ratio` × target words; polish returns the draft unchanged
fn sized_writer(ratio: f64) -> Arc<MockProvider> {
    MockProvider::new(move |_, request| {
        if let Some(target) = word_target(&request.prompt) {
            let n = (target as f64 * ratio).round() as usize;
            return Ok(vec!["word"; n].join(" "));
        }
        if let Some(draft) = draft_of(&request.prompt) {
            return Ok(draft);
        }
        Ok("A lighthouse over a calm harbour at dawn".to_string())
    })
}

fn outline(targets: &[u32]) -> Outline {
    Outline {
        title: "Practical Caching".to_string(),
        hook: "Most slow pages are slow for the same reasons.".to_string(),
        sections: targets
            .iter()
            .enumerate()
            .map(|(i, t)| Section::new(format!("Step {}", i + 1), *t).with_key_points(vec!["why"]))
            .collect(),
        conclusion: Conclusion {
            summary: "Measure, cache, then measure again.".to_string(),
            call_to_action: "Profile one endpoint this week.".to_string(),
        },
        seo_keywords: vec!["caching".to_string()],
    }
}

fn config(images: bool) -> Config {
    let mut config = Config::default();
    config.image.enabled = images;
    config
}

fn build_pipeline(
    provider: Arc<MockProvider>,
    images: ImageBehavior,
    config: &Config,
) -> WriterPipeline {
    WriterPipeline::new(provider, Arc::new(MockImages(images)), config)
        .with_timeouts(TimeoutConfig::fast())
}

fn sources() -> Vec<SourceRef> {
    vec![
        SourceRef::new("https://developer.mozilla.org/en-US/docs/Web/HTTP/Caching")
            .with_title("MDN HTTP caching"),
        SourceRef::new("https://www.rfc-editor.org/rfc/rfc9111"),
        SourceRef::new("https://web.dev/articles/http-cache").with_title("web.dev"),
    ]
}

#[tokio::test]
async fn exact_targets_are_accepted_first_try() {
    let provider = sized_writer(1.0);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline =
        build_pipeline(provider.clone(), ImageBehavior::Succeed, &config(false)).with_events(tx);

    let output = pipeline
        .run(&outline(&[100, 200, 150]), &WriterInputs::default())
        .await
        .unwrap();

    let counts: Vec<usize> = output.sections.iter().map(|s| s.word_count).collect();
    assert_eq!(counts, vec![100, 200, 150]);
    assert!(output.sections.iter().all(|s| s.attempts == 1));
    assert!(output.sections.iter().all(|s| s.state == SectionState::Valid));
    assert!(output.warnings.is_empty());
    // three sections, one polish, no assets
    assert_eq!(provider.calls(), 4);

    let doc = &output.full_document;
    assert!(doc.starts_with("# Practical Caching\n\nMost slow pages"));
    let step1 = doc.find("## Step 1").unwrap();
    let step2 = doc.find("## Step 2").unwrap();
    let step3 = doc.find("## Step 3").unwrap();
    let conclusion = doc.find("## Conclusion").unwrap();
    assert!(step1 < step2 && step2 < step3 && step3 < conclusion);
    assert!(doc.ends_with("Profile one endpoint this week."));

    assert_eq!(output.word_count, count_words(doc));
    assert_eq!(output.reading_time_minutes, output.word_count.div_ceil(200).max(1));
    assert_eq!(output.slug, "practical-caching");
    assert!(output.cover_image.is_none());

    let mut skipped = false;
    let mut completed = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            PipelineEvent::AssetsSkipped { .. } => skipped = true,
            PipelineEvent::Completed { warnings, .. } => {
                completed = true;
                assert_eq!(warnings, 0);
            }
            _ => {}
        }
    }
    assert!(skipped && completed);
}

#[tokio::test]
async fn oversized_sections_retry_then_accept_with_warning() {
    let provider = sized_writer(1.5);
    let pipeline = build_pipeline(provider.clone(), ImageBehavior::Succeed, &config(false));

    let output = pipeline
        .run(&outline(&[100, 200, 150]), &WriterInputs::default())
        .await
        .unwrap();

    // initial attempt plus two retries per section, then polish
    assert_eq!(provider.calls(), 3 * 3 + 1);
    for (report, target) in output.sections.iter().zip([100usize, 200, 150]) {
        assert_eq!(report.attempts, 3);
        assert_eq!(report.state, SectionState::AcceptedWithWarning);
        assert_eq!(report.word_count, target * 3 / 2);
    }
    assert!(output.has_section_warnings());
    assert_eq!(output.warnings.len(), 3);
    assert!(output.warnings[0].contains("Step 1"));
    assert!(output.full_document.contains("## Step 3"));
}

#[tokio::test]
async fn retry_recovers_when_second_attempt_fits() {
    let provider = MockProvider::new(|call, request| {
        if let Some(target) = word_target(&request.prompt) {
            let n = if call == 0 { target / 2 } else { target };
            return Ok(vec!["word"; n].join(" "));
        }
        Ok(draft_of(&request.prompt).unwrap_or_default())
    });
    let pipeline = build_pipeline(provider.clone(), ImageBehavior::Succeed, &config(false));

    let output = pipeline
        .run(&outline(&[120]), &WriterInputs::default())
        .await
        .unwrap();

    assert_eq!(output.sections[0].attempts, 2);
    assert_eq!(output.sections[0].state, SectionState::Valid);
    assert!(output.warnings.is_empty());
}

#[tokio::test]
async fn cancellation_stops_before_next_completion() {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let provider = MockProvider::new(move |_, request| {
        // Cancel while the first section is in flight
        trigger.cancel();
        let target = word_target(&request.prompt).unwrap_or(10);
        Ok(vec!["word"; target].join(" "))
    });
    let pipeline = build_pipeline(provider.clone(), ImageBehavior::Succeed, &config(true))
        .with_cancellation(cancel);

    let err = pipeline
        .run(&outline(&[100, 100]), &WriterInputs::default())
        .await
        .unwrap_err();

    match err {
        DraftError::Cancelled { stage } => assert_eq!(stage, "write_section"),
        other => panic!("expected cancellation, got {other}"),
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn completion_failure_aborts_the_run() {
    let provider = MockProvider::new(|call, request| {
        if call == 1 {
            return Err(DraftError::LlmApi("401 unauthorized".into()));
        }
        let target = word_target(&request.prompt).unwrap_or(10);
        Ok(vec!["word"; target].join(" "))
    });
    let pipeline = build_pipeline(provider, ImageBehavior::Succeed, &config(false));

    let result = pipeline
        .run(&outline(&[100, 100]), &WriterInputs::default())
        .await;
    assert!(matches!(result, Err(DraftError::LlmApi(_))));
}

#[tokio::test]
async fn asset_failures_do_not_fail_the_run() {
    for behavior in [ImageBehavior::Fail, ImageBehavior::Empty] {
        let pipeline = build_pipeline(sized_writer(1.0), behavior, &config(true));

        let output = pipeline
            .run(&outline(&[80]), &WriterInputs::default())
            .await
            .unwrap();

        assert!(output.cover_image.is_none());
        assert!(output.full_document.contains("## Step 1"));
        assert!(output.warnings.iter().any(|w| w.contains("Cover image")));
    }
}

#[tokio::test]
async fn cover_image_is_attached_when_generated() {
    let pipeline = build_pipeline(sized_writer(1.0), ImageBehavior::Succeed, &config(true));

    let output = pipeline
        .run(&outline(&[80]), &WriterInputs::default())
        .await
        .unwrap();

    let cover = output.cover_image.expect("cover image");
    assert_eq!(cover.image_base64, "iVBORw0KGgo=");
    assert!(!cover.prompt.is_empty());
    assert_eq!(output.metrics.stage_calls("generate_assets"), 1);
}

#[tokio::test]
async fn missing_citations_are_appended() {
    let inputs = WriterInputs {
        sources: sources(),
        ..WriterInputs::default()
    };
    let pipeline = build_pipeline(sized_writer(1.0), ImageBehavior::Succeed, &config(false));

    let output = pipeline.run(&outline(&[60, 60]), &inputs).await.unwrap();

    let doc = &output.full_document;
    assert!(doc.contains("## Sources"));
    assert!(doc.contains("- [MDN HTTP caching](https://developer.mozilla.org/en-US/docs/Web/HTTP/Caching)"));
    assert!(doc.contains("- [rfc-editor.org](https://www.rfc-editor.org/rfc/rfc9111)"));
    assert!(!doc.contains("web.dev/articles"));
}

#[tokio::test]
async fn inline_citations_count_toward_minimum() {
    let provider = MockProvider::new(|_, request| {
        if let Some(target) = word_target(&request.prompt) {
            return Ok(format!(
                "See [the RFC](https://www.rfc-editor.org/rfc/rfc9111) and [web.dev](https://web.dev/articles/http-cache). {}",
                vec!["word"; target.saturating_sub(6)].join(" ")
            ));
        }
        Ok(draft_of(&request.prompt).unwrap_or_default())
    });
    let inputs = WriterInputs {
        sources: sources(),
        ..WriterInputs::default()
    };
    let pipeline = build_pipeline(provider, ImageBehavior::Succeed, &config(false));

    let output = pipeline.run(&outline(&[60]), &inputs).await.unwrap();
    assert!(!output.full_document.contains("## Sources"));
}

#[tokio::test]
async fn em_dashes_never_survive() {
    let provider = MockProvider::new(|_, request| {
        if let Some(target) = word_target(&request.prompt) {
            let words = vec!["word"; target.saturating_sub(9)].join(" ");
            return Ok(format!("Caches \u{2014} used well &mdash; pay off &#8212; fast. {}", words));
        }
        // Polish sneaks one back in
        Ok(format!(
            "{}\n\nOne more thought \u{2014} measured.",
            draft_of(&request.prompt).unwrap_or_default()
        ))
    });
    let mut outline = outline(&[60, 60]);
    outline.title = "Caching \u{2014} Done Right".to_string();
    let pipeline = build_pipeline(provider, ImageBehavior::Succeed, &config(false));

    let output = pipeline.run(&outline, &WriterInputs::default()).await.unwrap();

    assert!(!contains_em_dash(&output.full_document));
    assert!(output.full_document.starts_with("# Caching, Done Right"));
    assert!(output.full_document.contains("Caches, used well, pay off, fast."));
}

#[tokio::test]
async fn only_allowed_internal_links_remain() {
    let provider = MockProvider::new(|_, request| {
        if let Some(target) = word_target(&request.prompt) {
            return Ok(format!(
                "Start with [the basics](/blog/cache-basics), skip [rumours](/blog/made-up), \
                 and see [old post](/articles/cache-basics). {}",
                vec!["word"; target.saturating_sub(12)].join(" ")
            ));
        }
        Ok(draft_of(&request.prompt).unwrap_or_default())
    });

    let mut outline = outline(&[60]);
    outline.sections[0].suggested_links = vec![SuggestedLink {
        article_id: "a1".to_string(),
        anchor_text: "the basics".to_string(),
    }];
    let inputs = WriterInputs {
        candidates: vec![
            CandidateArticle {
                id: "a1".to_string(),
                title: "Cache Basics".to_string(),
                slug: Some("cache-basics".to_string()),
            },
            CandidateArticle {
                id: "a2".to_string(),
                title: "Unrelated".to_string(),
                slug: Some("unrelated".to_string()),
            },
        ],
        ..WriterInputs::default()
    };
    let pipeline = build_pipeline(provider, ImageBehavior::Succeed, &config(false));

    let output = pipeline.run(&outline, &inputs).await.unwrap();

    let doc = &output.full_document;
    assert!(doc.contains("[the basics](/blog/cache-basics)"));
    assert!(doc.contains("skip rumours,"));
    assert!(!doc.contains("/blog/made-up"));
    assert_eq!(output.allowed_links.len(), 1);
    assert_eq!(output.allowed_links[0].url, "/blog/cache-basics");

    assert!(!output.internal_links.is_empty());
    assert!(output.internal_links.iter().all(|l| l.target_id == "a1"));
}
