//! Write Command
//!
//! Run the writer pipeline over an outline file, save the markdown and
//! record the article with its internal links.

use std::path::{Path, PathBuf};

use base64::Engine;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::progress::ProgressRenderer;
use crate::cli::ui::Output;
use crate::cli::util::{
    CommandContext, build_image_generator, build_provider, load_outline, load_sources,
};
use crate::storage::{ArticleStatus, ArticleStore, NewArticle};
use crate::types::{DraftError, Outline, Result};
use crate::writer::{CancelToken, WriterInputs, WriterOutput, WriterPipeline};

pub struct WriteOptions {
    pub outline: PathBuf,
    pub sources: Option<PathBuf>,
    pub instructions: Option<String>,
    pub output: Option<PathBuf>,
    pub no_save: bool,
    pub no_image: bool,
    pub publish: bool,
}

pub async fn run(options: WriteOptions, cancel: CancelToken) -> Result<()> {
    let mut ctx = CommandContext::load()?;
    if options.no_image {
        ctx.config.image.enabled = false;
    }

    let outline = load_outline(&options.outline)?;
    let sources = match &options.sources {
        Some(path) => load_sources(path)?,
        None => Vec::new(),
    };
    let candidates = ctx.db.candidate_articles()?;

    let out = Output::new();
    out.header(&outline.title);
    out.kv("Sections", outline.sections.len());
    out.kv("Word target", outline.total_word_target());
    out.kv("Sources", sources.len());
    out.kv("Link targets", candidates.len());
    if sources.len() < ctx.config.links.min_external_sources {
        out.warning(&format!(
            "Only {} source(s) given; the article needs {} citations",
            sources.len(),
            ctx.config.links.min_external_sources
        ));
    }
    println!();

    let provider = build_provider(&ctx.config)?;
    let images = build_image_generator(&ctx.config)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = ProgressRenderer::new(outline.sections.len()).spawn(rx);

    let pipeline = WriterPipeline::new(provider, images, &ctx.config)
        .with_cancellation(cancel)
        .with_events(tx);

    let inputs = WriterInputs {
        candidates,
        sources,
        custom_instructions: options.instructions,
    };
    let result = pipeline.run(&outline, &inputs).await;

    // Closing the channel lets the printer drain and exit
    drop(pipeline);
    if let Err(e) = printer.await {
        warn!("Progress printer stopped: {}", e);
    }
    let output = result?;

    let markdown_path = options
        .output
        .clone()
        .unwrap_or_else(|| ctx.drafts_dir().join(format!("{}.md", output.slug)));
    write_markdown(&markdown_path, &output.full_document)?;
    out.success(&format!("Saved {}", markdown_path.display()));

    if let Some(cover) = &output.cover_image {
        let cover_path = markdown_path.with_extension("png");
        match save_cover(&cover_path, &cover.image_base64) {
            Ok(()) => out.success(&format!("Saved cover {}", cover_path.display())),
            Err(e) => out.warning(&format!("Cover image not saved: {}", e)),
        }
    }

    if !options.no_save {
        let status = if options.publish {
            ArticleStatus::Published
        } else {
            ArticleStatus::Draft
        };
        save_article(&ctx, &outline, &output, status)?;
    }

    print_summary(&out, &output);
    Ok(())
}

fn save_article(
    ctx: &CommandContext,
    outline: &Outline,
    output: &WriterOutput,
    status: ArticleStatus,
) -> Result<()> {
    let article = NewArticle {
        title: outline.title.clone(),
        slug: output.slug.clone(),
        content: output.full_document.clone(),
        excerpt: output.excerpt.clone(),
        word_count: output.word_count,
        reading_time_minutes: output.reading_time_minutes,
        cover_image: output.cover_image.as_ref().map(|c| c.image_base64.clone()),
        seo_keywords: outline.seo_keywords.clone(),
        status,
    };

    let id = ctx.db.save_article(&article)?;
    let linked = ctx.db.save_internal_links(&id, &output.internal_links)?;
    info!(id = %id, links = linked, status = %status, "Article stored");

    let out = Output::new();
    out.success(&format!("Stored article {} ({})", id, status));
    if linked > 0 {
        out.kv("Internal links", linked);
    }
    Ok(())
}

fn write_markdown(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", document))?;
    Ok(())
}

fn save_cover(path: &Path, image_base64: &str) -> Result<()> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_base64)
        .map_err(|e| DraftError::parse("cover image", format!("invalid base64: {}", e)))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn print_summary(out: &Output, output: &WriterOutput) {
    out.section("Summary");
    out.kv("Words", output.word_count);
    out.kv(
        "Reading time",
        format!("{} min", output.reading_time_minutes),
    );
    out.kv("Slug", &output.slug);
    out.kv("Excerpt", &output.excerpt);

    out.section("Sections");
    for report in &output.sections {
        let line = format!(
            "{}. {}: {}/{} words, {} attempt(s)",
            report.index + 1,
            report.heading,
            report.word_count,
            report.word_target,
            report.attempts
        );
        if report.warning() {
            out.warning(&line);
        } else {
            out.success(&line);
        }
    }

    if !output.warnings.is_empty() {
        out.section("Warnings");
        for warning in &output.warnings {
            out.bullet(warning);
        }
    }

    out.section("Usage");
    println!("{}", output.metrics.display());
}
