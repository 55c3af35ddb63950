//! Replay command implementation.
//!
//! Drives a [`CacheModelNode`] through a scripted sequence of requests, asking
//! the lazy gate first and only building a model when the gate wants one.

use anyhow::{anyhow, Context, Result};
use cachenode_abstraction::{AttrValue, DEVICE_ATTR, DeviceProvider, Model};
use cachenode_models::node::MODEL_INPUT;
use cachenode_models::{
    AttributePlacement, CacheModelNode, CacheModelRequest, DeviceSelection, DeviceSupport,
    MockModel, ModelCache, NodeConfig, StaticDeviceProvider, WrapperVariant,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One scripted request.
#[derive(Debug, Clone, Deserialize)]
struct ReplayStep {
    #[serde(default)]
    cache_key: String,
    #[serde(default = "default_model_id")]
    model_id: String,
    #[serde(default)]
    device: DeviceSelection,
    #[serde(default)]
    offload: DeviceSelection,
    #[serde(default)]
    device_support: DeviceSupport,
}

fn default_model_id() -> String {
    "mock-model".to_string()
}

/// What one request produced.
#[derive(Debug, Clone, Serialize)]
struct ReplayOutcome {
    cache_key: String,
    hit: bool,
    model_id: String,
    variant: WrapperVariant,
    device: String,
}

/// Execute the replay command.
pub fn execute(config: &NodeConfig, script: &Path, json_output: bool) -> Result<()> {
    let content = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let steps: Vec<ReplayStep> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse script {}", script.display()))?;

    let outcomes = replay(config, steps)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for outcome in &outcomes {
        let status = if outcome.hit { "hit".green() } else { "miss".yellow() };
        let key = if outcome.cache_key.is_empty() { "\"\"" } else { outcome.cache_key.as_str() };
        println!(
            "{key} {status} model={} variant={} device={}",
            outcome.model_id, outcome.variant, outcome.device
        );
    }
    Ok(())
}

fn replay(config: &NodeConfig, steps: Vec<ReplayStep>) -> Result<Vec<ReplayOutcome>> {
    let devices: Arc<dyn DeviceProvider> = Arc::new(StaticDeviceProvider::from(&config.devices));
    let cache = Arc::new(ModelCache::new(Arc::new(AttributePlacement::new(Arc::clone(&devices)))));
    let node = CacheModelNode::new(cache, devices);

    let mut outcomes = Vec::with_capacity(steps.len());
    for (index, step) in steps.into_iter().enumerate() {
        let needs_model = node.check_lazy_status(&step.cache_key).contains(&MODEL_INPUT);

        let mut request = CacheModelRequest::new(step.cache_key.clone())
            .with_device(step.device)
            .with_offload(step.offload);
        if needs_model {
            let model = MockModel::new(step.model_id).with_device_support(step.device_support);
            request = request.with_model(Box::new(model));
        }

        let handle = node
            .cache_model(request)
            .with_context(|| format!("Request {} ('{}') failed", index, step.cache_key))?;
        let model = handle.read().map_err(|_| anyhow!("Model lock poisoned"))?;

        let device = match model.get_attr(DEVICE_ATTR) {
            Ok(AttrValue::None) => "unset".to_string(),
            Ok(value) => value.to_string(),
            Err(_) => "-".to_string(),
        };

        info!(cache_key = %step.cache_key, hit = !needs_model, "Replayed request");
        outcomes.push(ReplayOutcome {
            cache_key: step.cache_key,
            hit: !needs_model,
            model_id: model.model_id().to_string(),
            variant: model.variant(),
            device,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachenode_abstraction::Device;

    fn step(cache_key: &str, model_id: &str, device: DeviceSelection) -> ReplayStep {
        ReplayStep {
            cache_key: cache_key.to_string(),
            model_id: model_id.to_string(),
            device,
            offload: DeviceSelection::Auto,
            device_support: DeviceSupport::None,
        }
    }

    #[test]
    fn test_replay_hit_and_miss() {
        let outcomes = replay(
            &NodeConfig::default(),
            vec![
                step("m1", "first", DeviceSelection::Cpu),
                step("m1", "second", DeviceSelection::Gpu),
                step("m2", "third", DeviceSelection::Auto),
            ],
        )
        .unwrap();

        assert!(!outcomes[0].hit);
        assert_eq!(outcomes[0].device, "cpu");

        assert!(outcomes[1].hit);
        assert_eq!(outcomes[1].model_id, "first");
        assert_eq!(outcomes[1].device, Device::Cuda(0).to_string());

        assert!(!outcomes[2].hit);
        assert_eq!(outcomes[2].variant, WrapperVariant::SettableDevice);
    }

    #[test]
    fn test_replay_read_only_device() {
        let mut frozen = step("frozen", "frozen", DeviceSelection::Gpu);
        frozen.device_support = DeviceSupport::ReadOnly;

        let outcomes = replay(&NodeConfig::default(), vec![frozen]).unwrap();

        assert_eq!(outcomes[0].variant, WrapperVariant::InertDevice);
        assert_eq!(outcomes[0].device, "cpu");
    }

    #[test]
    fn test_step_defaults() {
        let step: ReplayStep = serde_json::from_str("{}").unwrap();
        assert_eq!(step.cache_key, "");
        assert_eq!(step.model_id, "mock-model");
        assert_eq!(step.device, DeviceSelection::Auto);
        assert_eq!(step.device_support, DeviceSupport::None);
    }
}
