//! Config command implementation.

use anyhow::{Context, Result};
use cachenode_models::{load_node_config, NodeConfig};
use colored::Colorize;
use std::path::Path;

/// Load configuration from `path`, or from the current workspace if `None`.
pub fn load(path: Option<&Path>) -> Result<NodeConfig> {
    match path {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            load_node_config(&cwd).context("Failed to load workspace config")
        }
    }
}

/// Execute the config command.
pub fn execute(config: &NodeConfig, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("{}", "Devices".bold());
    println!("  accelerator: {}", config.devices.accelerator);
    println!("  offload:     {}", config.devices.offload);
    Ok(())
}
