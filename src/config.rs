//! Simulator configuration, loaded from TOML and overridden from the command line.

use crate::analysis::EnergyModel;
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host-side overhead added to a measured run to synthesize the SSD path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsdOffsets {
    pub cpu: f64,
    pub latency_secs: f64,
    pub energy: f64,
}

impl Default for SsdOffsets {
    fn default() -> Self {
        Self {
            cpu: 60.0,
            latency_secs: 1.35,
            energy: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Directory holding `<table>.csv` files
    pub data_dir: PathBuf,

    /// Length of one CPU sampling window
    pub sample_interval_ms: u64,

    pub offsets: SsdOffsets,

    pub energy: EnergyModel,

    /// argv of an external power tool, run once per query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_command: Option<Vec<String>>,

    pub stat_path: PathBuf,

    pub meminfo_path: PathBuf,

    /// TOML schema registry replacing the built-in tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_file: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sample_interval_ms: 1000,
            offsets: SsdOffsets::default(),
            energy: EnergyModel::default(),
            power_command: None,
            stat_path: PathBuf::from("/proc/stat"),
            meminfo_path: PathBuf::from("/proc/meminfo"),
            schema_file: None,
        }
    }
}

impl SimConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            return Err(SimError::Config(
                "sample_interval_ms must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.power_command, Some(argv) if argv.is_empty()) {
            return Err(SimError::Config("power_command is empty".to_string()));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}
