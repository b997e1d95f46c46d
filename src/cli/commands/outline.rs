//! Outline Command
//!
//! Plan an article with the outline agent, optionally gathering sources
//! first, and print or save the outline.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::ui::Output;
use crate::cli::util::{build_provider, load_sources, write_structured};
use crate::ai::TimeoutConfig;
use crate::config::ConfigLoader;
use crate::constants::research;
use crate::types::{Result, SourceRef};
use crate::writer::{CompletionSourceSearch, OutlineAgent, gather_sources};

pub struct OutlineOptions {
    pub topic: String,
    pub sources: Option<PathBuf>,
    /// Extra queries answered by the completion client before planning
    pub research: Vec<String>,
    pub words: u32,
    pub instructions: Option<String>,
    pub output: Option<PathBuf>,
}

pub async fn run(options: OutlineOptions) -> Result<()> {
    let config = ConfigLoader::load()?;
    let provider = build_provider(&config)?;
    let timeouts = TimeoutConfig::from_config(&config);
    let out = Output::new();

    let mut sources = match &options.sources {
        Some(path) => load_sources(path)?,
        None => Vec::new(),
    };

    if !options.research.is_empty() {
        let search = Arc::new(CompletionSourceSearch::new(
            Arc::clone(&provider),
            research::RESULTS_PER_QUERY,
        ));
        let found = gather_sources(
            search,
            &options.research,
            timeouts.search,
            research::MAX_CONCURRENCY,
        )
        .await;
        out.info(&format!(
            "{} source(s) suggested for {} quer{}",
            found.len(),
            options.research.len(),
            if options.research.len() == 1 { "y" } else { "ies" }
        ));
        sources = merge_sources(sources, found);
    }

    let agent = OutlineAgent::new(provider, timeouts.completion);
    let parsed = agent
        .generate(
            &options.topic,
            &sources,
            options.words,
            options.instructions.as_deref(),
        )
        .await?;

    if parsed.provenance.is_degraded() {
        out.warning(&format!(
            "Outline recovered from malformed output ({}); review it before writing",
            parsed.provenance
        ));
    }

    match &options.output {
        Some(path) => {
            write_structured(path, &parsed.outline)?;
            out.success(&format!(
                "Saved outline with {} sections ({} words) to {}",
                parsed.outline.sections.len(),
                parsed.outline.total_word_target(),
                path.display()
            ));
            if !sources.is_empty() {
                let sources_path = path.with_extension("sources.json");
                write_structured(&sources_path, &sources)?;
                out.kv("Sources", sources_path.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&parsed.outline)?),
    }

    Ok(())
}

/// Given sources first, then new URLs from research
fn merge_sources(given: Vec<SourceRef>, found: Vec<SourceRef>) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    given
        .into_iter()
        .chain(found)
        .filter(|s| seen.insert(s.url.trim_end_matches('/').to_string()))
        .collect()
}
