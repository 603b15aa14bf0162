//! Storyline configuration
//!
//! Loads configuration from `storyline.toml` or `.storylinerc.json` in the
//! working directory, falling back to `~/.config/storyline/config.toml`.
//!
//! # Configuration Format
//!
//! ```toml
//! # storyline.toml
//!
//! [storage]
//! path = "storyline.redb"
//!
//! [descriptions]
//! max_length = 4000   # 0 = unlimited
//!
//! [evaluator]
//! cache = true
//!
//! [defaults]
//! format = "text"     # or "json"
//! ```
//!
//! `STORYLINE_DB` overrides `storage.path`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_DB_FILE: &str = "storyline.redb";
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 4000;

/// Environment variable that overrides the database path
pub const DB_PATH_ENV: &str = "STORYLINE_DB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorylineConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub descriptions: DescriptionConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub defaults: CliDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file, relative to the working directory unless absolute
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
        }
    }
}

fn default_max_length() -> usize {
    DEFAULT_MAX_DESCRIPTION_LENGTH
}

impl DescriptionConfig {
    /// Effective limit; zero disables it
    pub fn limit(&self) -> Option<usize> {
        (self.max_length > 0).then_some(self.max_length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Memoize unlocked sets per player
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

fn default_true() -> bool {
    true
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliDefaults {
    #[serde(default)]
    pub format: OutputFormat,
}

impl StorylineConfig {
    /// Database path resolved against `base`, honoring `STORYLINE_DB`
    pub fn db_path(&self, base: &Path) -> PathBuf {
        let path = std::env::var_os(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.storage.path.clone());
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    }

    /// Path of the user-level fallback config
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("storyline").join("config.toml"))
    }

    /// Contents written by `storyline init`
    pub fn template() -> &'static str {
        r#"# Storyline configuration

[storage]
# Database file (relative to this directory)
path = "storyline.redb"

[descriptions]
# Maximum solution description length in characters (0 = unlimited)
max_length = 4000

[evaluator]
# Cache unlocked sets per player
cache = true

[defaults]
# Output format: text or json
format = "text"
"#
    }
}

/// Load configuration for the storyline rooted at `dir`.
///
/// Tries `storyline.toml`, then `.storylinerc.json`, then the user config.
/// A file that fails to parse is skipped with a warning.
pub fn load_storyline_config(dir: &Path) -> StorylineConfig {
    let toml_path = dir.join("storyline.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded storyline config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = dir.join(".storylinerc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded storyline config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    if let Some(user_path) = StorylineConfig::user_config_path().filter(|p| p.exists()) {
        match load_toml_config(&user_path) {
            Ok(config) => {
                debug!("Loaded user config from {}", user_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", user_path.display(), e);
            }
        }
    }

    debug!("No storyline config found, using defaults");
    StorylineConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<StorylineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: StorylineConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<StorylineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: StorylineConfig = serde_json::from_str(&content)?;
    Ok(config)
}
