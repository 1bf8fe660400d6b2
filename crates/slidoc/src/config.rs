//! Configuration schema for slidoc
//!
//! Config lives at `.config/slidoc/config.json` relative to the working
//! directory, or wherever `--config` points.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use serde::Deserialize;
use slidoc_core::{CompileOptions, PluginRegistry};

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".config/slidoc/config.json";

/// Root configuration for slidoc
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compile options applied to every file
    pub options: CompileOptions,

    /// Directory artifacts are written to (default: `slides`)
    pub out_dir: Option<PathBuf>,

    /// Interactive plugins, by name
    pub plugins: PluginRegistry,

    /// Glob patterns selecting markdown files when a directory is given
    pub include: Vec<String>,

    /// Glob patterns to exclude
    pub exclude: Vec<String>,
}

impl Config {
    pub fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| PathBuf::from("slides"))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        eyre::bail!(
            "Config file not found at {}\n\n\
             Create a config file with your compile options:\n\n\
             {{\n  \
                 \"options\": {{ \"strip\": [\"notes\"], \"number\": true }},\n  \
                 \"out_dir\": \"slides\",\n  \
                 \"plugins\": {{}}\n\
             }}",
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Load config if it exists, otherwise return the default config.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}
