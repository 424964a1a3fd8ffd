//! TOML configuration parsing.
//!
//! Every setting has a default, so the config file is optional. Command-line
//! flags are applied on top by `main.rs`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::aggregate::default_excluded_dirs;
use crate::materialize::{ImageMode, LOSSLESS_QUALITY};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregateConfig {
    /// Questions root; auto-detected from the working directory when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Base URL prepended to image paths in reference mode.
    #[serde(default)]
    pub image_base: Option<String>,
    #[serde(default)]
    pub embed: bool,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_excluded_dirs")]
    pub exclude: Vec<String>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            root: None,
            output: None,
            image_base: None,
            embed: false,
            quality: LOSSLESS_QUALITY,
            exclude: default_excluded_dirs(),
        }
    }
}

fn default_quality() -> u8 {
    LOSSLESS_QUALITY
}

impl AggregateConfig {
    /// Image mode selected by `embed`, `quality` and `image_base`.
    pub fn image_mode(&self) -> ImageMode {
        if self.embed {
            ImageMode::Embed {
                quality: self.quality,
            }
        } else {
            ImageMode::Reference {
                base_url: self.image_base.clone(),
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_serve_dir")]
    pub dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            dir: default_serve_dir(),
        }
    }
}

fn default_port() -> u16 {
    3001
}
fn default_serve_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Configuration used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let quality = self.aggregate.quality;
        if !(1..=100).contains(&quality) {
            anyhow::bail!("aggregate.quality must be in [1, 100], got {}", quality);
        }

        if let Some(base) = &self.aggregate.image_base {
            if base.trim().is_empty() {
                anyhow::bail!("aggregate.image_base must not be empty");
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Loads `path` if it exists, otherwise falls back to [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}
