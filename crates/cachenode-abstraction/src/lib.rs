//! Model abstraction layer for cachenode.
//!
//! This crate defines the attribute surface every cacheable model exposes, the
//! device identifiers models are placed on, and the external services the cache
//! calls into (device enumeration and weight placement).

mod device;

pub use device::{Device, DeviceParseError};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of the attribute that records which device a model currently lives on.
pub const DEVICE_ATTR: &str = "device";

/// Error raised by attribute access on a [`Model`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeError {
    /// The model has no attribute with this name.
    #[error("Model has no attribute '{name}'")]
    Missing {
        /// The attribute name.
        name: String,
    },

    /// The attribute exists but cannot be assigned or deleted.
    #[error("Attribute '{name}' is read-only")]
    ReadOnly {
        /// The attribute name.
        name: String,
    },
}

impl AttributeError {
    /// Creates a `Missing` error for the given attribute name.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    /// Creates a `ReadOnly` error for the given attribute name.
    pub fn read_only(name: impl Into<String>) -> Self {
        Self::ReadOnly { name: name.into() }
    }
}

/// Represents an error that can occur when constructing, placing or calling a model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// The caller-supplied constructor failed.
    #[error("Construction Error: {0}")]
    Construction(String),

    /// Moving the model's weights to the requested device failed.
    #[error("Placement Error: {0}")]
    Placement(String),

    /// Calling the model failed.
    #[error("Invocation Error: {0}")]
    Invocation(String),

    /// A required node input was not supplied by the host.
    #[error("Missing Input: {0}")]
    MissingInput(String),

    /// An attribute read or write failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    /// Absence of a value.
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A compute device.
    Device(Device),
    /// A list of values.
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Returns the device held by this value, if any.
    #[must_use]
    pub const fn as_device(&self) -> Option<Device> {
        match self {
            Self::Device(device) => Some(*device),
            _ => None,
        }
    }

    /// Returns true if this is `AttrValue::None`.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Device(device) => write!(f, "{device}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<Device> for AttrValue {
    fn from(device: Device) -> Self {
        Self::Device(device)
    }
}

impl From<Option<Device>> for AttrValue {
    fn from(device: Option<Device>) -> Self {
        device.map_or(Self::None, Self::Device)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A trait for objects that can be cached and placed on a compute device.
///
/// The surface is deliberately small: named attribute access plus invocation.
/// Anything the cache or its callers need from a model goes through it.
pub trait Model: Send + Sync {
    /// Returns the ID of the model.
    fn model_id(&self) -> &str;

    /// Reads an attribute.
    ///
    /// # Errors
    /// Returns `AttributeError::Missing` if the model has no such attribute.
    fn get_attr(&self, name: &str) -> Result<AttrValue, AttributeError>;

    /// Assigns an attribute.
    ///
    /// # Errors
    /// Returns `AttributeError::ReadOnly` if the attribute cannot be assigned.
    fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError>;

    /// Deletes an attribute.
    ///
    /// # Errors
    /// Returns an `AttributeError` if the attribute is missing or cannot be deleted.
    fn del_attr(&mut self, name: &str) -> Result<(), AttributeError>;

    /// Calls the model.
    ///
    /// # Errors
    /// Returns a `ModelError` if the call fails.
    fn invoke(&self, args: &[AttrValue]) -> Result<AttrValue, ModelError>;

    /// Returns the device the model reports, if it reports a concrete one.
    fn device(&self) -> Option<Device> {
        self.get_attr(DEVICE_ATTR).ok().and_then(|value| value.as_device())
    }
}

/// Enumerates the devices available to the process.
pub trait DeviceProvider: Send + Sync {
    /// The accelerator models are loaded onto for compute.
    fn accelerator(&self) -> Device;

    /// The device models are offloaded to when not in use.
    fn offload_device(&self) -> Device;
}

/// Moves a model's weights so they are resident on a device before use.
pub trait Placement: Send + Sync {
    /// Ensures `model` is resident on `load_device`, with `offload_device` as its
    /// parking spot. `None` for either means "use your own default".
    ///
    /// Implementations must tolerate being called on an already-resident model.
    ///
    /// # Errors
    /// Returns a `ModelError` if the weights cannot be moved.
    fn ensure_resident(
        &self,
        model: &mut dyn Model,
        load_device: Option<Device>,
        offload_device: Option<Device>,
    ) -> Result<(), ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_as_device() {
        assert_eq!(AttrValue::Device(Device::Cpu).as_device(), Some(Device::Cpu));
        assert_eq!(AttrValue::None.as_device(), None);
        assert_eq!(AttrValue::from("cpu").as_device(), None);
    }

    #[test]
    fn test_attr_value_from_optional_device() {
        assert_eq!(AttrValue::from(Some(Device::Mps)), AttrValue::Device(Device::Mps));
        assert!(AttrValue::from(None::<Device>).is_none());
    }

    #[test]
    fn test_attribute_error_converts_to_model_error() {
        let err: ModelError = AttributeError::missing("weights").into();
        assert_eq!(err, ModelError::Attribute(AttributeError::Missing { name: "weights".to_string() }));
        assert_eq!(err.to_string(), "Model has no attribute 'weights'");
    }

    #[test]
    fn test_model_error_display() {
        assert_eq!(
            ModelError::Construction("out of memory".to_string()).to_string(),
            "Construction Error: out of memory"
        );
        assert_eq!(
            AttributeError::read_only("device").to_string(),
            "Attribute 'device' is read-only"
        );
    }

    #[test]
    fn test_attr_value_display() {
        assert_eq!(AttrValue::from("auto").to_string(), r#""auto""#);
        assert_eq!(AttrValue::None.to_string(), "None");
        assert_eq!(
            AttrValue::List(vec![AttrValue::Int(1), AttrValue::Device(Device::Cuda(0))]).to_string(),
            "[1, cuda:0]"
        );
    }

    #[test]
    fn test_attr_value_serialization() {
        let value = AttrValue::List(vec![AttrValue::Int(1), AttrValue::Device(Device::Cuda(0))]);
        let json = serde_json::to_string(&value).unwrap();
        let back: AttrValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
