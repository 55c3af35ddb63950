//! Settable `device` attribute for arbitrary models.
//!
//! Models come in three shapes: no `device` attribute at all, a freely
//! assignable one, or one that rejects writes. [`wrap_for_device_control`]
//! probes a model once and picks the composition that lets callers always
//! assign `device` without checking which shape they hold.

use cachenode_abstraction::{AttrValue, AttributeError, DEVICE_ATTR, Model, ModelError};
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

/// Forwards everything to the inner model except `device`, which lives in an
/// auxiliary slot owned by the wrapper.
pub struct DeviceWrapper {
    inner: Box<dyn Model>,
    /// `None` once deleted; reads then fail until the next write.
    device: Option<AttrValue>,
}

impl DeviceWrapper {
    /// Wraps `inner` with an unset device slot.
    #[must_use]
    pub fn new(inner: Box<dyn Model>) -> Self {
        Self { inner, device: Some(AttrValue::None) }
    }
}

impl Model for DeviceWrapper {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn get_attr(&self, name: &str) -> Result<AttrValue, AttributeError> {
        if name == DEVICE_ATTR {
            return self.device.clone().ok_or_else(|| AttributeError::missing(name));
        }
        self.inner.get_attr(name)
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        if name == DEVICE_ATTR {
            self.device = Some(value);
            return Ok(());
        }
        self.inner.set_attr(name, value)
    }

    fn del_attr(&mut self, name: &str) -> Result<(), AttributeError> {
        if name == DEVICE_ATTR {
            return self.device.take().map(|_| ()).ok_or_else(|| AttributeError::missing(name));
        }
        self.inner.del_attr(name)
    }

    fn invoke(&self, args: &[AttrValue]) -> Result<AttrValue, ModelError> {
        self.inner.invoke(args)
    }
}

/// Forwards everything to the inner model, silently dropping writes to `device`.
pub struct ReadOnlyDeviceWrapper {
    inner: Box<dyn Model>,
}

impl ReadOnlyDeviceWrapper {
    /// Wraps `inner`, whose `device` attribute cannot be reassigned.
    #[must_use]
    pub fn new(inner: Box<dyn Model>) -> Self {
        Self { inner }
    }
}

impl Model for ReadOnlyDeviceWrapper {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn get_attr(&self, name: &str) -> Result<AttrValue, AttributeError> {
        self.inner.get_attr(name)
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        if name == DEVICE_ATTR {
            trace!(model_id = %self.inner.model_id(), ?value, "Discarding write to read-only device");
            return Ok(());
        }
        self.inner.set_attr(name, value)
    }

    fn del_attr(&mut self, name: &str) -> Result<(), AttributeError> {
        self.inner.del_attr(name)
    }

    fn invoke(&self, args: &[AttrValue]) -> Result<AttrValue, ModelError> {
        self.inner.invoke(args)
    }
}

/// Which composition [`wrap_for_device_control`] selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperVariant {
    /// The model's own `device` attribute is assignable; no wrapper.
    Native,
    /// The model has no `device`; the wrapper supplies one.
    SettableDevice,
    /// The model's `device` is read-only; writes are discarded.
    InertDevice,
}

impl fmt::Display for WrapperVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::SettableDevice => write!(f, "settable_device"),
            Self::InertDevice => write!(f, "inert_device"),
        }
    }
}

/// A model whose `device` attribute can always be assigned.
pub enum WrappedModel {
    /// The model itself, unwrapped.
    Native(Box<dyn Model>),
    /// The model behind a synthesized device slot.
    SettableDevice(DeviceWrapper),
    /// The model behind a write-discarding device guard.
    InertDevice(ReadOnlyDeviceWrapper),
}

impl WrappedModel {
    /// Returns which composition this is.
    #[must_use]
    pub const fn variant(&self) -> WrapperVariant {
        match self {
            Self::Native(_) => WrapperVariant::Native,
            Self::SettableDevice(_) => WrapperVariant::SettableDevice,
            Self::InertDevice(_) => WrapperVariant::InertDevice,
        }
    }

    /// Returns the underlying model, bypassing any wrapper.
    #[must_use]
    pub fn inner(&self) -> &dyn Model {
        match self {
            Self::Native(model) => model.as_ref(),
            Self::SettableDevice(wrapper) => wrapper.inner.as_ref(),
            Self::InertDevice(wrapper) => wrapper.inner.as_ref(),
        }
    }

    /// Consumes the wrapper and returns the underlying model.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Model> {
        match self {
            Self::Native(model) => model,
            Self::SettableDevice(wrapper) => wrapper.inner,
            Self::InertDevice(wrapper) => wrapper.inner,
        }
    }

    fn as_model(&self) -> &dyn Model {
        match self {
            Self::Native(model) => model.as_ref(),
            Self::SettableDevice(wrapper) => wrapper,
            Self::InertDevice(wrapper) => wrapper,
        }
    }

    fn as_model_mut(&mut self) -> &mut dyn Model {
        match self {
            Self::Native(model) => model.as_mut(),
            Self::SettableDevice(wrapper) => wrapper,
            Self::InertDevice(wrapper) => wrapper,
        }
    }
}

impl Model for WrappedModel {
    fn model_id(&self) -> &str {
        self.as_model().model_id()
    }

    fn get_attr(&self, name: &str) -> Result<AttrValue, AttributeError> {
        self.as_model().get_attr(name)
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), AttributeError> {
        self.as_model_mut().set_attr(name, value)
    }

    fn del_attr(&mut self, name: &str) -> Result<(), AttributeError> {
        self.as_model_mut().del_attr(name)
    }

    fn invoke(&self, args: &[AttrValue]) -> Result<AttrValue, ModelError> {
        self.as_model().invoke(args)
    }
}

impl fmt::Debug for WrappedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedModel")
            .field("model_id", &self.model_id())
            .field("variant", &self.variant())
            .field("device", &self.get_attr(DEVICE_ATTR).ok())
            .finish()
    }
}

/// Selects the composition that gives `model` a settable `device`.
///
/// Reads `device`; if that fails the model gets a [`DeviceWrapper`]. Otherwise
/// the value is written back unchanged: success means the model is returned
/// as-is, failure means it gets a [`ReadOnlyDeviceWrapper`]. Probe failures are
/// never reported to the caller.
pub fn wrap_for_device_control(mut model: Box<dyn Model>) -> WrappedModel {
    let current = match model.get_attr(DEVICE_ATTR) {
        Ok(value) => value,
        Err(_) => {
            debug!(model_id = %model.model_id(), "Model has no device attribute, synthesizing one");
            return WrappedModel::SettableDevice(DeviceWrapper::new(model));
        }
    };

    match model.set_attr(DEVICE_ATTR, current) {
        Ok(()) => WrappedModel::Native(model),
        Err(_) => {
            debug!(model_id = %model.model_id(), "Model device is read-only, discarding writes");
            WrappedModel::InertDevice(ReadOnlyDeviceWrapper::new(model))
        }
    }
}
