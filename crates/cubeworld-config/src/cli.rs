//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// cubeworld command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cubeworld", about = "Chunked voxel world driver")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Render radius in chunks.
    #[arg(long)]
    pub render_radius: Option<u32>,

    /// Cache radius in chunks.
    #[arg(long)]
    pub cache_radius: Option<u32>,

    /// Bound the world to this many chunks from the origin.
    #[arg(long)]
    pub world_radius: Option<u32>,

    /// Generate chunks inline instead of on worker threads.
    #[arg(long)]
    pub sync: bool,

    /// Generation worker count (0 = from CPU count).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Save file path.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Start a fresh world even if the save file exists.
    #[arg(long)]
    pub new_world: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(r) = args.render_radius {
            self.world.render_radius = r;
        }
        if let Some(r) = args.cache_radius {
            self.world.cache_radius = r;
        }
        if let Some(r) = args.world_radius {
            self.world.world_radius = Some(r);
        }
        if args.sync {
            self.pipeline.threaded = false;
        }
        if let Some(workers) = args.workers {
            self.pipeline.worker_threads = workers;
        }
        if let Some(ref path) = args.save {
            self.save.path = path.clone();
        }
        if args.new_world {
            self.save.load_on_start = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(1234),
            render_radius: Some(2),
            world_radius: Some(50),
            sync: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 1234);
        assert_eq!(config.world.render_radius, 2);
        assert_eq!(config.world.world_radius, Some(50));
        assert!(!config.pipeline.threaded);
        // Non-overridden fields retain defaults
        assert_eq!(config.world.cache_radius, 6);
        assert!(config.save.load_on_start);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "cubeworld",
            "--seed",
            "7",
            "--save",
            "saves/a.json",
            "--new-world",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.save.path, PathBuf::from("saves/a.json"));
        assert!(!config.save.load_on_start);
        assert_eq!(config.debug.log_level, "debug");
    }
}
