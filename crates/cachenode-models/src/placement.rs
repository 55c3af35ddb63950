//! In-process device enumeration and placement.
//!
//! Hosts normally provide their own [`DeviceProvider`] and [`Placement`]. These
//! implementations cover standalone use: devices come from configuration and
//! placement records the target device on the model's `device` attribute.

use cachenode_abstraction::{DEVICE_ATTR, Device, DeviceProvider, Model, ModelError, Placement};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::DeviceConfig;

/// Device provider backed by fixed, configured devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticDeviceProvider {
    accelerator: Device,
    offload: Device,
}

impl StaticDeviceProvider {
    /// Creates a provider reporting the given devices.
    #[must_use]
    pub const fn new(accelerator: Device, offload: Device) -> Self {
        Self { accelerator, offload }
    }
}

impl Default for StaticDeviceProvider {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for StaticDeviceProvider {
    fn from(config: &DeviceConfig) -> Self {
        Self::new(config.accelerator, config.offload)
    }
}

impl DeviceProvider for StaticDeviceProvider {
    fn accelerator(&self) -> Device {
        self.accelerator
    }

    fn offload_device(&self) -> Device {
        self.offload
    }
}

/// Placement that records residency on the model's `device` attribute.
///
/// A `None` load device resolves to the provider's accelerator and a `None`
/// offload device to the provider's offload device.
pub struct AttributePlacement {
    devices: Arc<dyn DeviceProvider>,
}

impl AttributePlacement {
    /// Creates a placement service using `devices` for its defaults.
    #[must_use]
    pub fn new(devices: Arc<dyn DeviceProvider>) -> Self {
        Self { devices }
    }
}

impl Placement for AttributePlacement {
    fn ensure_resident(
        &self,
        model: &mut dyn Model,
        load_device: Option<Device>,
        offload_device: Option<Device>,
    ) -> Result<(), ModelError> {
        let target = load_device.unwrap_or_else(|| self.devices.accelerator());
        let offload = offload_device.unwrap_or_else(|| self.devices.offload_device());

        if model.device() == Some(target) {
            trace!(model_id = %model.model_id(), device = %target, "Model already resident");
            return Ok(());
        }

        model.set_attr(DEVICE_ATTR, target.into()).map_err(|e| {
            ModelError::Placement(format!(
                "failed to move model '{}' to {}: {}",
                model.model_id(),
                target,
                e
            ))
        })?;

        debug!(
            model_id = %model.model_id(),
            device = %target,
            offload = %offload,
            "Model placed"
        );
        Ok(())
    }
}
