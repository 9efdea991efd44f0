use std::error::Error;

use super::print_json;
use crate::{Context, Manager};

pub fn run(context: &Context, manager: &Manager) -> Result<(), Box<dyn Error>> {
    let seeders = manager.list_seeders();
    if context.json {
        return print_json(&seeders);
    }
    for definition in &seeders {
        let environments = if definition.environments.is_empty() {
            "all".to_string()
        } else {
            definition.environments.iter().cloned().collect::<Vec<_>>().join(",")
        };
        let dependencies = if definition.dependencies.is_empty() {
            "-".to_string()
        } else {
            definition.dependencies.iter().cloned().collect::<Vec<_>>().join(",")
        };
        println!(
            "{:<28} priority {:<5} env {:<20} deps {:<24} {}",
            definition.name,
            definition.priority,
            environments,
            dependencies,
            &definition.content_hash[..12.min(definition.content_hash.len())]
        );
    }
    Ok(())
}
