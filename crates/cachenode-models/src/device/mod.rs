//! Device control for cached models.
//!
//! Two concerns live here: giving every cached model a settable `device`
//! attribute regardless of what the model natively supports, and turning the
//! node's `auto`/`cpu`/`gpu` choice into a concrete device request.

pub mod selection;
pub mod wrapper;

pub use selection::{resolve, DeviceSelection, DeviceSelectionParseError};
pub use wrapper::{
    wrap_for_device_control, DeviceWrapper, ReadOnlyDeviceWrapper, WrappedModel, WrapperVariant,
};
