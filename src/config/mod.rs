//! Configuration module for Storyline
//!
//! This module handles:
//! - Storyline configuration (storyline.toml / .storylinerc.json)
//! - Storage location and description limits
//! - CLI defaults

mod storyline_config;

pub use storyline_config::{
    load_storyline_config, CliDefaults, DescriptionConfig, EvaluatorConfig, OutputFormat,
    StorageConfig, StorylineConfig, DB_PATH_ENV, DEFAULT_DB_FILE,
    DEFAULT_MAX_DESCRIPTION_LENGTH,
};
