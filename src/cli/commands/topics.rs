//! Topics Command
//!
//! Ask the completion client for article ideas.

use crate::ai::TimeoutConfig;
use crate::cli::ui::Output;
use crate::cli::util::build_provider;
use crate::config::ConfigLoader;
use crate::types::Result;
use crate::writer::OutlineAgent;

pub async fn run(subject: &str, count: usize) -> Result<()> {
    let config = ConfigLoader::load()?;
    let provider = build_provider(&config)?;
    let agent = OutlineAgent::new(provider, TimeoutConfig::from_config(&config).completion);

    let parsed = agent.suggest_topics(subject, count.max(1)).await?;

    let out = Output::new();
    out.header(&format!("Ideas for {}", subject));
    for (i, topic) in parsed.topics.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, topic);
    }
    if parsed.provenance.is_degraded() {
        out.warning("Ideas were recovered from an unstructured response");
    }
    Ok(())
}
