//! Resolution of the node's device choice into a concrete device request.

use cachenode_abstraction::{Device, DeviceProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string names no [`DeviceSelection`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown device selection '{0}' (expected auto, cpu or gpu)")]
pub struct DeviceSelectionParseError(pub String);

/// The device choice offered to node users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelection {
    /// Let the placement service decide.
    #[default]
    Auto,
    /// Host memory.
    Cpu,
    /// The process's accelerator.
    Gpu,
}

impl DeviceSelection {
    /// Every choice, in the order the node lists them.
    pub const ALL: [Self; 3] = [Self::Auto, Self::Cpu, Self::Gpu];

    /// The choice's name as shown to node users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceSelection {
    type Err = DeviceSelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            _ => Err(DeviceSelectionParseError(s.to_string())),
        }
    }
}

/// Resolves a selection into a device, or `None` to defer to the placement
/// service's own default.
pub fn resolve(selection: DeviceSelection, devices: &dyn DeviceProvider) -> Option<Device> {
    match selection {
        DeviceSelection::Auto => None,
        DeviceSelection::Cpu => Some(Device::Cpu),
        DeviceSelection::Gpu => Some(devices.accelerator()),
    }
}
