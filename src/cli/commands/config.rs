//! Config Command
//!
//! Usage:
//!   draftsmith config show [-g] [-f json]
//!   draftsmith config path
//!   draftsmith config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        // Merged effective config
        return ConfigLoader::show_config(format == "json");
    }

    match ConfigLoader::global_config_path() {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            if format == "toml" {
                println!("{}", content);
            } else {
                println!("# Global Config: {}\n", path.display());
                println!("{}", content);
            }
        }
        Some(_) => {
            println!("No global config found.");
            println!("Run 'draftsmith config init --global' to create one.");
        }
        None => println!("Cannot determine global config directory."),
    }
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    let out = Output::new();
    out.success("Initialized global configuration");
    out.kv("Directory", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        out.kv("Config", config_path.display());
    }
    Ok(())
}

pub fn init_project(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let dir = ConfigLoader::init_project_at(&root, force)?;
    let out = Output::new();
    out.success("Initialized project configuration");
    out.kv("Directory", dir.display());
    out.kv("Config", ConfigLoader::project_config_path().display());
    Ok(())
}
