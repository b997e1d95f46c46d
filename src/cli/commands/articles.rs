//! Articles Command
//!
//! List stored articles and mark drafts as published so later runs can
//! link to them.

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::{ArticleStatus, ArticleStore};
use crate::types::Result;

pub fn list(limit: usize, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let articles = ctx.db.list_articles(limit)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    let out = Output::new();
    if articles.is_empty() {
        out.info("No articles yet. Run 'draftsmith write --outline <file>' to create one.");
        return Ok(());
    }

    out.header(&format!("Articles ({})", articles.len()));
    for article in &articles {
        let status = match article.status {
            ArticleStatus::Published => style(article.status.as_str()).green(),
            ArticleStatus::Draft => style(article.status.as_str()).yellow(),
        };
        println!(
            "  {} {} {}",
            status,
            style(&article.title).bold(),
            style(format!("/{}", article.slug)).dim()
        );
        println!(
            "    {} words, {} min{}, {}  {}",
            article.word_count,
            article.reading_time_minutes,
            if article.has_cover { ", cover" } else { "" },
            article.created_at,
            style(&article.id).dim()
        );
    }
    Ok(())
}

pub fn publish(id_or_slug: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    ctx.db.set_status(id_or_slug, ArticleStatus::Published)?;
    Output::new().success(&format!("Published {}", id_or_slug));
    Ok(())
}
