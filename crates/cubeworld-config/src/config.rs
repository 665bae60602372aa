//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use cubeworld_terrain::GenerationParams;
use cubeworld_voxel::ChunkManagerConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Working-set radii, world bound and seed.
    pub world: WorldConfig,
    /// Terrain generation parameters.
    pub generation: GenerationParams,
    /// Generation worker pool.
    pub pipeline: PipelineConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
    /// Where the world is saved.
    pub save: SaveSettings,
}

/// World configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunks within this Chebyshev distance are loaded and drawn.
    pub render_radius: u32,
    /// Chunks within this distance stay resident once loaded.
    pub cache_radius: u32,
    /// Optional bound on chunk distance from the origin.
    pub world_radius: Option<u32>,
    pub seed: u64,
}

/// Generation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Generate on background threads instead of inline on the tick.
    pub threaded: bool,
    /// Worker count; 0 sizes the pool from the CPU count.
    pub worker_threads: usize,
    /// Queued requests beyond this are deferred to a later tick.
    pub max_queued: usize,
    /// Finished chunks buffered before workers block.
    pub result_capacity: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter, e.g. "info" or "debug,cubeworld_voxel=trace".
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

/// Save file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SaveSettings {
    /// Save file path; relative paths are resolved against the config directory.
    pub path: PathBuf,
    /// Load `path` on startup when it exists.
    pub load_on_start: bool,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        let manager = ChunkManagerConfig::default();
        Self {
            render_radius: manager.render_radius,
            cache_radius: manager.cache_radius,
            world_radius: manager.world_radius,
            seed: manager.seed,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threaded: true,
            worker_threads: 0,
            max_queued: 128,
            result_capacity: 256,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("world.json"),
            load_on_start: true,
        }
    }
}

/// Per-user config directory, e.g. `~/.config/cubeworld` on Linux.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("cubeworld"))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Conversions ---

impl Config {
    /// Manager settings with radii clamped to the manager's limits.
    pub fn manager_config(&self) -> ChunkManagerConfig {
        ChunkManagerConfig {
            render_radius: self.world.render_radius,
            cache_radius: self.world.cache_radius,
            world_radius: self.world.world_radius,
            seed: self.world.seed,
        }
        .clamped()
    }

    /// Generation parameters clamped to their safe ranges.
    pub fn generation_params(&self) -> GenerationParams {
        self.generation.clamped()
    }

    pub fn save_path(&self, config_dir: &Path) -> PathBuf {
        if self.save.path.is_absolute() {
            self.save.path.clone()
        } else {
            config_dir.join(&self.save.path)
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Returns `Some(new_config)` if the file on disk differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        if new_config != *self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

// ---- Tests ----
