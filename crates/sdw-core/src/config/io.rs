//! YAML file loading
//!
//! Two flavours: the coordinator config is optional and falls back to
//! defaults, a scenario file is required and fails loudly.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a YAML file that must exist
///
/// # Errors
/// Read and parse failures, with the path in the error context.
pub fn read_yaml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))
}

/// Load an optional config file
///
/// A missing file silently yields defaults; an unreadable or invalid file
/// yields defaults with a warning, so a broken config never blocks audio.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::debug!("config: {:?} not found, using defaults", path);
        return T::default();
    }

    match read_yaml(path) {
        Ok(config) => {
            log::info!("config: loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("config: {:#}, using defaults", e);
            T::default()
        }
    }
}
