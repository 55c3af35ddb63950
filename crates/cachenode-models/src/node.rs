//! The `CacheModel` graph node.
//!
//! This is the surface a node-graph host sees: a registration table describing
//! the node's inputs and outputs, a lazy-status check the host runs before
//! evaluating the upstream `model` input, and the node function itself.

use cachenode_abstraction::{AttrValue, DeviceProvider, Model, ModelError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheKey, ModelCache, ModelHandle};
use crate::device::{resolve, DeviceSelection};

/// Registered class name of the node.
pub const NODE_CLASS_NAME: &str = "CacheModel";

/// Name of the lazily evaluated model input.
pub const MODEL_INPUT: &str = "model";

/// Type of a node input or output as seen by the host's type checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeSpec {
    /// Wildcard compatible with every type.
    Any,
    /// A named host type such as `STRING`.
    Named(String),
    /// One of a fixed set of string choices.
    Choice(Vec<String>),
}

impl TypeSpec {
    /// Whether a value of type `other` may be connected where `self` is expected.
    #[must_use]
    pub fn accepts(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => true,
            _ => self == other,
        }
    }

    fn device_choice() -> Self {
        Self::Choice(DeviceSelection::ALL.iter().map(|s| s.to_string()).collect())
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Choice(choices) => write!(f, "[{}]", choices.join(", ")),
        }
    }
}

/// One required input of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    /// Input name.
    pub name: &'static str,
    /// Accepted type.
    #[serde(rename = "type")]
    pub type_spec: TypeSpec,
    /// Value used when the host supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<AttrValue>,
    /// Whether the host may skip evaluating this input.
    pub lazy: bool,
}

/// Everything a host needs to register and call a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    /// Registered class name.
    pub class_name: &'static str,
    /// Required inputs, in display order.
    pub inputs: Vec<InputSpec>,
    /// Output types.
    pub return_types: Vec<TypeSpec>,
    /// Name of the function the host calls.
    pub function: &'static str,
    /// Menu category.
    pub category: &'static str,
}

impl NodeDescriptor {
    /// Look up an input by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Registration table of every node this crate provides.
#[must_use]
pub fn node_class_mappings() -> BTreeMap<&'static str, NodeDescriptor> {
    BTreeMap::from([(NODE_CLASS_NAME, CacheModelNode::descriptor())])
}

/// Inputs of one `CacheModel` invocation.
#[derive(Default)]
pub struct CacheModelRequest {
    /// The constructed model, or `None` if the host skipped evaluating it.
    pub model: Option<Box<dyn Model>>,
    /// Where to load the model.
    pub device: DeviceSelection,
    /// Where to offload the model.
    pub offload: DeviceSelection,
    /// Cache key; empty by default.
    pub cache_key: String,
}

impl CacheModelRequest {
    /// A request for `cache_key` with default devices and no model input.
    pub fn new(cache_key: impl Into<String>) -> Self {
        Self { cache_key: cache_key.into(), ..Self::default() }
    }

    /// Supplies the evaluated model input.
    #[must_use]
    pub fn with_model(mut self, model: Box<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the load device.
    #[must_use]
    pub fn with_device(mut self, device: DeviceSelection) -> Self {
        self.device = device;
        self
    }

    /// Sets the offload device.
    #[must_use]
    pub fn with_offload(mut self, offload: DeviceSelection) -> Self {
        self.offload = offload;
        self
    }
}

/// The `CacheModel` node bound to a cache and a device provider.
pub struct CacheModelNode {
    cache: Arc<ModelCache>,
    devices: Arc<dyn DeviceProvider>,
}

impl CacheModelNode {
    /// Creates a node backed by `cache`, resolving `gpu` through `devices`.
    #[must_use]
    pub fn new(cache: Arc<ModelCache>, devices: Arc<dyn DeviceProvider>) -> Self {
        Self { cache, devices }
    }

    /// The node's registration entry.
    #[must_use]
    pub fn descriptor() -> NodeDescriptor {
        let default_selection = Some(AttrValue::from(DeviceSelection::default().as_str()));
        NodeDescriptor {
            class_name: NODE_CLASS_NAME,
            inputs: vec![
                InputSpec { name: MODEL_INPUT, type_spec: TypeSpec::Any, default: None, lazy: true },
                InputSpec {
                    name: "device",
                    type_spec: TypeSpec::device_choice(),
                    default: default_selection.clone(),
                    lazy: false,
                },
                InputSpec {
                    name: "offload",
                    type_spec: TypeSpec::device_choice(),
                    default: default_selection,
                    lazy: false,
                },
                InputSpec {
                    name: "cache_key",
                    type_spec: TypeSpec::Named("STRING".to_string()),
                    default: Some(AttrValue::from("")),
                    lazy: false,
                },
            ],
            return_types: vec![TypeSpec::Any],
            function: "cache_model",
            category: "cache",
        }
    }

    /// Names of lazy inputs the host must evaluate before calling
    /// [`cache_model`](Self::cache_model): `model` unless `cache_key` is cached.
    pub fn check_lazy_status(&self, cache_key: &str) -> Vec<&'static str> {
        if self.cache.needs_construction_input(cache_key) {
            vec![MODEL_INPUT]
        } else {
            debug!(cache_key = %cache_key, "Cached, skipping model input");
            Vec::new()
        }
    }

    /// Returns the cached model for the request's key, caching the supplied
    /// model on a miss.
    ///
    /// # Errors
    /// Returns `ModelError::MissingInput` on a miss without a model input, or
    /// any placement error.
    pub fn cache_model(&self, request: CacheModelRequest) -> Result<ModelHandle, ModelError> {
        let CacheModelRequest { model, device, offload, cache_key } = request;
        let load_device = resolve(device, self.devices.as_ref());
        let offload_device = resolve(offload, self.devices.as_ref());

        debug!(
            cache_key = %cache_key,
            device = %device,
            offload = %offload,
            has_model = model.is_some(),
            "Executing CacheModel"
        );

        self.cache.get_or_create(
            CacheKey::from(cache_key),
            move || model.ok_or_else(|| ModelError::MissingInput(MODEL_INPUT.to_string())),
            load_device,
            offload_device,
        )
    }

    /// The cache this node reads and fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }
}
