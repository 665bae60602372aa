//! Runtime settings for the cubeworld tools.
//!
//! Settings persist to disk as `config.ron`. Unknown fields are ignored and
//! missing ones take their defaults, so files survive version changes. CLI
//! arguments parsed with clap override whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, PipelineConfig, SaveSettings, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
