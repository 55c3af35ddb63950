//! Configuration for the cache node.
//!
//! Loaded from `.cachenode/config.toml` in the workspace root:
//!
//! ```toml
//! [devices]
//! accelerator = "cuda:0"
//! offload = "cpu"
//! ```

use cachenode_abstraction::Device;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Device defaults used when a request asks for `gpu` or defers with `auto`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// The accelerator `gpu` resolves to (default: cuda:0).
    #[serde(default = "default_accelerator")]
    pub accelerator: Device,

    /// Where models are parked when not in use (default: cpu).
    #[serde(default = "default_offload")]
    pub offload: Device,
}

fn default_accelerator() -> Device {
    Device::Cuda(0)
}

fn default_offload() -> Device {
    Device::Cpu
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { accelerator: default_accelerator(), offload: default_offload() }
    }
}

/// Root configuration for the cache node.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Device defaults.
    #[serde(default)]
    pub devices: DeviceConfig,
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The configured accelerator is host memory.
    #[error("Invalid accelerator: must not be cpu")]
    CpuAccelerator,
}

impl NodeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.devices.accelerator.is_accelerator() {
            return Err(ConfigError::CpuAccelerator);
        }
        Ok(())
    }

    /// Load and validate configuration from a specific file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration from the workspace config file.
///
/// Returns defaults if `.cachenode/config.toml` does not exist.
///
/// # Errors
/// Returns error if the config file exists but cannot be read, parsed or validated.
pub fn load_node_config(workspace_root: &Path) -> Result<NodeConfig, ConfigError> {
    let config_path = default_config_path(workspace_root);

    if !config_path.exists() {
        return Ok(NodeConfig::default());
    }

    NodeConfig::from_file(&config_path)
}

/// Get the default config file path for a workspace.
#[must_use]
pub fn default_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".cachenode").join("config.toml")
}
