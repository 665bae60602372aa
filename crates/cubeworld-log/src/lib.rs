//! Structured logging for the cubeworld crates.
//!
//! Console output carries uptime, thread name and target. Debug builds can
//! additionally write a JSON log file for post-mortem analysis of
//! generation worker behavior. `RUST_LOG` always wins over the configured
//! level.

use std::path::{Path, PathBuf};

use cubeworld_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file inside the log directory.
pub const LOG_FILE_NAME: &str = "cubeworld.log";

/// Filter string from the config's `debug.log_level`, or the default.
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.clone()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Where the JSON log goes, if anywhere.
///
/// File logging needs a debug build, a directory and `debug.log_to_file`.
pub fn log_file_path(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> Option<PathBuf> {
    let wants_file = config.is_none_or(|config| config.debug.log_to_file);
    match log_dir {
        Some(dir) if debug_build && wants_file => Some(dir.join(LOG_FILE_NAME)),
        _ => None,
    }
}

/// Installs the global tracing subscriber.
///
/// Call once at startup. A second call panics inside `tracing-subscriber`,
/// as with any global subscriber.
///
/// ```no_run
/// use cubeworld_config::Config;
///
/// let config = Config::default();
/// cubeworld_log::init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true) // chunk-gen-N workers
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(path) = log_file_path(log_dir, debug_build, config)
        && let Some(dir) = path.parent()
        && std::fs::create_dir_all(dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(&path)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        tracing::debug!(file = %path.display(), "logging initialized");
        return;
    }

    subscriber.init();
    tracing::debug!("logging initialized");
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter = default_env_filter();
        assert!(format!("{filter}").contains("info"));
    }

    #[test]
    fn test_filter_directive_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "debug,cubeworld_terrain=trace".to_string();
        assert_eq!(filter_directive(Some(&config)), "debug,cubeworld_terrain=trace");
    }

    #[test]
    fn test_blank_level_falls_back_to_default() {
        let mut config = Config::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
        assert_eq!(filter_directive(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_subsystem_filters_parse() {
        for directive in [
            "info",
            "debug,cubeworld_voxel=trace",
            "warn,cubeworld_save=debug,cubeworld_terrain=info",
            "error",
        ] {
            assert!(EnvFilter::try_new(directive).is_ok(), "failed to parse {directive}");
        }
    }

    #[test]
    fn test_log_file_only_in_debug_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        assert_eq!(
            log_file_path(Some(dir.path()), true, Some(&config)),
            Some(dir.path().join(LOG_FILE_NAME))
        );
        assert_eq!(log_file_path(Some(dir.path()), false, Some(&config)), None);
        assert_eq!(log_file_path(None, true, Some(&config)), None);
    }

    #[test]
    fn test_log_file_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.debug.log_to_file = false;
        assert_eq!(log_file_path(Some(dir.path()), true, Some(&config)), None);
        assert!(log_file_path(Some(dir.path()), true, None).is_some());
    }
}
