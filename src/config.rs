//! Engine configuration loaded from `~/.sapf/config.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Renderer and device settings. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate. None = device default.
    pub sample_rate: Option<u32>,
    /// Output channel count. None = device default.
    pub channels: Option<u16>,
    /// Frames per block when rendering offline.
    pub block_size: usize,
    /// Base seed for noise and random nodes.
    pub seed: u64,
    /// Initial master volume, `0.0..=1.0`.
    pub master_volume: f32,
    /// Limiter ceiling, `(0.0, 1.0]`.
    pub ceiling: f32,
    /// Longest delay a graph may allocate.
    pub max_delay_seconds: f64,
    /// Capacity of the control → audio command ring.
    pub command_capacity: usize,
    /// Capacity of the scope tap ring. 0 disables the tap.
    pub scope_capacity: usize,
}

impl EngineConfig {
    /// Load config from the standard path (~/.sapf/config.yaml).
    /// Returns None if the file doesn't exist or can't be parsed.
    pub fn load() -> Option<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path).ok()
    }

    /// Load config from `path`, reporting why it failed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".sapf").join("config.yaml"))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: None,
            block_size: 512,
            seed: 42,
            master_volume: 0.8,
            ceiling: 1.0,
            max_delay_seconds: 10.0,
            command_capacity: 64,
            scope_capacity: 8192,
        }
    }
}
