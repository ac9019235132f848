//! Host configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! swap_timeout_ms = 500
//! preset_dir = "/usr/share/ampnet/models"
//! initial_mode = "static"
//! ```

use crate::{LoadError, Result};
use ampnet_core::ProcessMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// How often a waiting swap request re-checks the mailbox.
    pub poll_interval_ms: u64,
    /// Give up on a swap the audio thread has not picked up. `0` waits
    /// forever.
    pub swap_timeout_ms: u64,
    /// Retired model pairs the audio thread can queue before it stops
    /// adopting new ones.
    pub retire_capacity: usize,
    /// Collector thread wake-up period.
    pub collector_interval_ms: u64,
    pub preset_dir: PathBuf,
    pub initial_mode: ProcessMode,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            swap_timeout_ms: 2000,
            retire_capacity: 8,
            collector_interval_ms: 50,
            preset_dir: PathBuf::from("assets/models"),
            initial_mode: ProcessMode::Dynamic,
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(LoadError::Config("poll_interval_ms must be positive".into()));
        }
        if self.retire_capacity == 0 {
            return Err(LoadError::Config("retire_capacity must be at least 1".into()));
        }
        if self.collector_interval_ms == 0 {
            return Err(LoadError::Config(
                "collector_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LoadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| LoadError::Config(e.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn swap_timeout(&self) -> Option<Duration> {
        match self.swap_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn collector_interval(&self) -> Duration {
        Duration::from_millis(self.collector_interval_ms)
    }
}
