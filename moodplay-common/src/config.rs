//! Configuration loading and path resolution
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! The resolved paths are collected into an immutable [`Paths`] struct that
//! is constructed once at startup and passed by reference into the session
//! coordinator; there is no ambient global configuration.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Immutable resolved filesystem configuration
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root of the emotion/language partitioned music library
    pub library_root: PathBuf,
    /// Classifier model weights (JSON)
    pub model_path: PathBuf,
    /// Per-user history file (JSON)
    pub history_path: PathBuf,
    /// Directory the frame grabber spools captured frames into
    pub spool_dir: PathBuf,
}

impl Paths {
    /// Resolve all paths from CLI arguments, environment, config file and
    /// OS defaults
    pub fn resolve(
        library_root: Option<&Path>,
        model_path: Option<&Path>,
        history_path: Option<&Path>,
        spool_dir: Option<&Path>,
    ) -> Self {
        let data_dir = default_data_dir();
        Self {
            library_root: resolve_path(library_root, "MOODPLAY_LIBRARY_ROOT", "library_root", || {
                data_dir.join("Emotion_music")
            }),
            model_path: resolve_path(model_path, "MOODPLAY_MODEL", "model_path", || {
                data_dir.join("emotion_model.json")
            }),
            history_path: resolve_path(history_path, "MOODPLAY_HISTORY", "history_path", || {
                data_dir.join("history.json")
            }),
            spool_dir: resolve_path(spool_dir, "MOODPLAY_SPOOL", "spool_dir", || {
                data_dir.join("frames")
            }),
        }
    }
}

/// Resolve one path following the priority order
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_file_key: &str,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(value) = config.get(config_file_key).and_then(|v| v.as_str()) {
                    return PathBuf::from(value);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default()
}

/// Locate the configuration file for the platform
fn locate_config_file() -> Result<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("moodplay").join("config.toml")) {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/moodplay/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("moodplay"))
        .unwrap_or_else(|| PathBuf::from("./moodplay_data"))
}
