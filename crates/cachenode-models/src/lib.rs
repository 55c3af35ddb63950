//! Model caching and device placement for cachenode.
//!
//! This crate keeps expensive-to-construct models in a keyed cache, gives every
//! cached model a settable `device` attribute, and exposes the whole thing as a
//! `CacheModel` graph node.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cachenode_models::{
//!     AttributePlacement, CacheModelNode, CacheModelRequest, MockModel, ModelCache,
//!     StaticDeviceProvider,
//! };
//!
//! let devices = Arc::new(StaticDeviceProvider::default());
//! let cache = Arc::new(ModelCache::new(Arc::new(AttributePlacement::new(devices.clone()))));
//! let node = CacheModelNode::new(cache, devices);
//!
//! assert_eq!(node.check_lazy_status("sdxl"), vec!["model"]);
//! let request = CacheModelRequest::new("sdxl").with_model(Box::new(MockModel::new("sdxl".into())));
//! node.cache_model(request).unwrap();
//! assert!(node.check_lazy_status("sdxl").is_empty());
//! ```

pub mod cache;
pub mod config;
pub mod device;
pub mod node;
pub mod placement;

use cachenode_abstraction::{AttrValue, AttributeError, DEVICE_ATTR, Device, Model, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub use cache::{CacheKey, CacheStats, ModelCache, ModelHandle};
pub use config::{load_node_config, ConfigError, DeviceConfig, NodeConfig};
pub use device::{
    resolve, wrap_for_device_control, DeviceSelection, DeviceSelectionParseError, DeviceWrapper,
    ReadOnlyDeviceWrapper, WrappedModel, WrapperVariant,
};
pub use node::{
    node_class_mappings, CacheModelNode, CacheModelRequest, InputSpec, NodeDescriptor, TypeSpec,
};
pub use placement::{AttributePlacement, StaticDeviceProvider};

/// How a [`MockModel`] exposes its `device` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSupport {
    /// No `device` attribute.
    #[default]
    None,
    /// A `device` attribute that can be reassigned.
    Settable,
    /// A `device` attribute that rejects writes and deletes.
    ReadOnly,
}

/// A mock implementation of the `Model` trait for testing and demonstration.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    attrs: BTreeMap<String, AttrValue>,
    device_support: DeviceSupport,
}

impl MockModel {
    /// Device reported by mocks created with a `device` attribute.
    pub const INITIAL_DEVICE: Device = Device::Cpu;

    /// Creates a new `MockModel` with the given ID and no attributes.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, attrs: BTreeMap::new(), device_support: DeviceSupport::None }
    }

    /// Sets how the mock exposes `device`.
    #[must_use]
    pub fn with_device_support(mut self, device_support: DeviceSupport) -> Self {
        self.device_support = device_support;
        if device_support == DeviceSupport::None {
            self.attrs.remove(DEVICE_ATTR);
        } else {
            self.attrs.insert(DEVICE_ATTR.to_string(), Self::INITIAL_DEVICE.into());
        }
        self
    }

    /// Adds an ordinary attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: AttrValue) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    fn is_read_only(&self, name: &str) -> bool {
        name == DEVICE_ATTR && self.device_support == DeviceSupport::ReadOnly
    }
}

impl Model for MockModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn get_attr(&self, name: &str) -> Result<AttrValue, AttributeError> {
        self.attrs.get(name).cloned().ok_or_else(|| AttributeError::missing(name))
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        if self.is_read_only(name) {
            return Err(AttributeError::read_only(name));
        }
        self.attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn del_attr(&mut self, name: &str) -> Result<(), AttributeError> {
        if self.is_read_only(name) {
            return Err(AttributeError::read_only(name));
        }
        self.attrs.remove(name).map(|_| ()).ok_or_else(|| AttributeError::missing(name))
    }

    fn invoke(&self, args: &[AttrValue]) -> Result<AttrValue, ModelError> {
        debug!(model_id = %self.id, arg_count = args.len(), "MockModel invoked");

        let mut output = Vec::with_capacity(args.len() + 1);
        output.push(AttrValue::Str(self.id.clone()));
        output.extend_from_slice(args);
        Ok(AttrValue::List(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_model_without_device() {
        let model = MockModel::new("m".to_string());
        assert_eq!(
            model.get_attr(DEVICE_ATTR),
            Err(AttributeError::Missing { name: "device".to_string() })
        );
        assert_eq!(model.device(), None);
    }

    #[test]
    fn test_mock_model_settable_device() {
        let mut model = MockModel::new("m".to_string()).with_device_support(DeviceSupport::Settable);
        assert_eq!(model.device(), Some(MockModel::INITIAL_DEVICE));

        model.set_attr(DEVICE_ATTR, Device::Cuda(0).into()).unwrap();
        assert_eq!(model.device(), Some(Device::Cuda(0)));
    }

    #[test]
    fn test_mock_model_read_only_device() {
        let mut model = MockModel::new("m".to_string()).with_device_support(DeviceSupport::ReadOnly);

        assert_eq!(
            model.set_attr(DEVICE_ATTR, Device::Cuda(0).into()),
            Err(AttributeError::ReadOnly { name: "device".to_string() })
        );
        assert!(model.del_attr(DEVICE_ATTR).is_err());
        assert_eq!(model.device(), Some(MockModel::INITIAL_DEVICE));
    }

    #[test]
    fn test_mock_model_invoke_echoes() {
        let model = MockModel::new("echo".to_string());
        let output = model.invoke(&[AttrValue::Int(1), AttrValue::from("x")]).unwrap();
        assert_eq!(
            output,
            AttrValue::List(vec![AttrValue::from("echo"), AttrValue::Int(1), AttrValue::from("x")])
        );
    }

    #[test]
    fn test_mock_model_attribute_round_trip() {
        let mut model = MockModel::new("m".to_string()).with_attr("dtype", "fp16".into());
        assert_eq!(model.get_attr("dtype").unwrap(), AttrValue::from("fp16"));
        model.del_attr("dtype").unwrap();
        assert!(model.del_attr("dtype").is_err());
    }
}
