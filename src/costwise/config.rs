use crate::error::{CostwiseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

/// Configuration for costwise, stored in .costwise/config.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostwiseConfig {
    /// Write batch auto-commits at this many pending ops.
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    /// Write batch auto-commits after this many idle seconds.
    #[serde(default = "default_batch_idle_secs")]
    pub batch_idle_secs: u64,

    /// Full-client auto-save interval in seconds.
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
}

fn default_batch_capacity() -> usize {
    crate::store::batch::DEFAULT_CAPACITY
}

fn default_batch_idle_secs() -> u64 {
    crate::store::batch::DEFAULT_IDLE.as_secs()
}

fn default_autosave_interval_secs() -> u64 {
    crate::clients::DEFAULT_AUTOSAVE_INTERVAL.as_secs()
}

impl Default for CostwiseConfig {
    fn default() -> Self {
        Self {
            batch_capacity: default_batch_capacity(),
            batch_idle_secs: default_batch_idle_secs(),
            autosave_interval_secs: default_autosave_interval_secs(),
        }
    }
}

impl CostwiseConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path).map_err(CostwiseError::Io)?;
        let config = serde_json::from_str(&content).map_err(CostwiseError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(CostwiseError::Io)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(CostwiseError::Serialization)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content).map_err(CostwiseError::Io)?;
        Ok(())
    }

    pub fn batch_idle(&self) -> Duration {
        Duration::from_secs(self.batch_idle_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "batch-capacity" => Ok(self.batch_capacity.to_string()),
            "batch-idle-secs" => Ok(self.batch_idle_secs.to_string()),
            "autosave-interval-secs" => Ok(self.autosave_interval_secs.to_string()),
            other => Err(CostwiseError::Validation(format!(
                "Unknown config key '{}'",
                other
            ))),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse = |v: &str| {
            v.parse::<u64>()
                .map_err(|_| CostwiseError::Validation(format!("'{}' is not a number", v)))
        };
        match key {
            "batch-capacity" => self.batch_capacity = parse(value)?.max(1) as usize,
            "batch-idle-secs" => self.batch_idle_secs = parse(value)?,
            "autosave-interval-secs" => self.autosave_interval_secs = parse(value)?,
            other => {
                return Err(CostwiseError::Validation(format!(
                    "Unknown config key '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}
