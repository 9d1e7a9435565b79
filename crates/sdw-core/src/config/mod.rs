//! Coordinator configuration
//!
//! Configuration is stored as YAML. Default location:
//! `~/.config/sdw/coordinator.yaml`
//!
//! # Usage
//!
//! ```ignore
//! use sdw_core::config::{default_config_path, load_config, CoordinatorConfig};
//!
//! let config: CoordinatorConfig = load_config(&default_config_path(CONFIG_FILENAME));
//! ```

mod io;
mod paths;

use serde::{Deserialize, Serialize};

pub use io::{load_config, read_yaml};
pub use paths::{default_config_dir, default_config_path};

/// File name of the coordinator config inside the config directory
pub const CONFIG_FILENAME: &str = "coordinator.yaml";

/// What hw_params does when the TDM slot configuration fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TdmErrorPolicy {
    /// Log the failure and report success to the PCM core
    #[default]
    LogOnly,
    /// Return the failure from hw_params
    Propagate,
}

/// Root coordinator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Handling of TDM configuration errors raised from hw_params
    pub tdm_errors: TdmErrorPolicy,
}

impl CoordinatorConfig {
    /// Config that surfaces TDM errors from hw_params
    pub fn propagating() -> Self {
        Self {
            tdm_errors: TdmErrorPolicy::Propagate,
        }
    }

    pub fn with_tdm_errors(mut self, policy: TdmErrorPolicy) -> Self {
        self.tdm_errors = policy;
        self
    }
}
