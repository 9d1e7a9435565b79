//! Path utilities for coordinator configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `~/.config/sdw` (platform config dir), or `./sdw` when the
/// platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sdw")
}

/// Get the default path of a config file
///
/// # Arguments
/// * `filename` - Config file name (e.g., "coordinator.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
