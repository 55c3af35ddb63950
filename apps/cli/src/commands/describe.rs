//! Describe command implementation.

use anyhow::Result;
use cachenode_models::node_class_mappings;
use colored::Colorize;

/// Execute the describe command.
pub fn execute(json_output: bool) -> Result<()> {
    let mappings = node_class_mappings();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }

    for (class_name, descriptor) in &mappings {
        println!("{} ({})", class_name.bold().cyan(), descriptor.category);
        println!("  function: {}", descriptor.function);
        println!("  inputs:");
        for input in &descriptor.inputs {
            let mut line = format!("    {}: {}", input.name, input.type_spec);
            if let Some(default) = &input.default {
                line.push_str(&format!(" = {default}"));
            }
            if input.lazy {
                line.push_str(" (lazy)");
            }
            println!("{line}");
        }
        let returns: Vec<_> = descriptor.return_types.iter().map(ToString::to_string).collect();
        println!("  returns: {}", returns.join(", "));
    }
    Ok(())
}
