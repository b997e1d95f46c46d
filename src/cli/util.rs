//! CLI Utilities
//!
//! Shared helpers for command implementations: project checks, database
//! access, collaborator construction and input file loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::image::{SharedImageGenerator, create_image_generator};
use crate::ai::provider::{
    ProviderConfig, RetryConfig, RetryingProvider, SharedProvider, create_provider,
};
use crate::config::{Config, ConfigLoader};
use crate::storage::{Database, SharedDatabase};
use crate::types::{DraftError, Outline, Result, SourceRef};

/// Command execution context
///
/// Bundles what most commands need: the project directory, the loaded
/// configuration and an initialized database.
#[derive(Clone)]
pub struct CommandContext {
    /// Project directory (.draftsmith)
    pub project_dir: PathBuf,
    /// Shared database handle
    pub db: SharedDatabase,
    /// Loaded configuration
    pub config: Config,
}

impl CommandContext {
    /// Validate initialization, load config and open the database.
    pub fn load() -> Result<Self> {
        let project_dir = require_initialized()?;
        let config = ConfigLoader::load()?;
        let db = open_database(&config)?;

        Ok(Self {
            project_dir,
            db: Arc::new(db),
            config,
        })
    }

    /// Where drafts are written when no output path is given
    pub fn drafts_dir(&self) -> PathBuf {
        self.project_dir.join("drafts")
    }
}

/// Require `.draftsmith/` in the working directory
pub fn require_initialized() -> Result<PathBuf> {
    let project_dir = ConfigLoader::project_dir();

    if !project_dir.exists() {
        return Err(DraftError::NotInitialized);
    }

    Ok(project_dir)
}

pub fn is_initialized() -> bool {
    ConfigLoader::is_project_initialized()
}

/// Open the configured database and bring its schema up to date
pub fn open_database(config: &Config) -> Result<Database> {
    let db = Database::open(&config.storage.database_path)?;
    db.initialize()?;
    Ok(db)
}

/// Completion client from config, wrapped with transient-failure retries
pub fn build_provider(config: &Config) -> Result<SharedProvider> {
    let inner = create_provider(&ProviderConfig::from(&config.llm))?;
    let retry = RetryConfig::default()
        .with_max_retries(config.llm.max_retries)
        .with_attempt_timeout(Duration::from_secs(config.llm.timeout_secs));
    Ok(Arc::new(RetryingProvider::new(inner, retry)))
}

pub fn build_image_generator(config: &Config) -> Result<SharedImageGenerator> {
    create_image_generator(&config.image, config.llm.api_base.clone())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Read an outline from a `.json`, `.yaml` or `.yml` file and validate it
pub fn load_outline(path: &Path) -> Result<Outline> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DraftError::Config(format!("Cannot read outline {}: {}", path.display(), e))
    })?;

    let outline: Outline = if is_yaml(path) {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    outline.validate()?;
    Ok(outline)
}

/// Read citation sources.
///
/// `.json` files hold an array of `{url, title?, snippet?}`. Anything else
/// is read line by line as `URL [title]`; blank lines and `#` comments are
/// skipped.
pub fn load_sources(path: &Path) -> Result<Vec<SourceRef>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DraftError::Config(format!("Cannot read sources {}: {}", path.display(), e))
    })?;

    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        return Ok(serde_json::from_str(&content)?);
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((url, title)) if !title.trim().is_empty() => {
                SourceRef::new(url).with_title(title.trim())
            }
            _ => SourceRef::new(line),
        })
        .collect())
}

/// Write `value` as YAML or pretty JSON depending on the file extension
pub fn write_structured<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = if is_yaml(path) {
        serde_yaml::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}
