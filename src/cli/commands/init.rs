//! Init Command
//!
//! Initialize Draftsmith in the current directory.

use crate::cli::ui::Output;
use crate::cli::util::open_database;
use crate::config::ConfigLoader;
use crate::types::{DraftError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let project_dir = root.join(ConfigLoader::project_dir());

    if project_dir.exists() && !force {
        return Err(DraftError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    ConfigLoader::init_project_at(&root, force)?;

    // Never overwrite a user's global config from here
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let config = ConfigLoader::load()?;
    open_database(&config)?;

    let out = Output::new();
    out.success("Initialized Draftsmith in .draftsmith/");
    out.kv("Config", ConfigLoader::project_config_path().display());
    out.kv("Database", config.storage.database_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set OPENAI_API_KEY (or configure [llm] for Ollama)");
    println!("  2. Run 'draftsmith outline --topic \"...\" --output outline.json'");
    println!("  3. Run 'draftsmith write --outline outline.json'");

    Ok(())
}
