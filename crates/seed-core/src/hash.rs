use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::definition::SeederDefinition;
use crate::errors::SeedError;
use crate::serde::to_canonical_json_bytes;

/// Metadata fields that participate in the content hash.
#[derive(Serialize)]
struct HashedMetadata<'a> {
    name: &'a str,
    description: &'a str,
    environments: Vec<&'a str>,
    dependencies: Vec<&'a str>,
    tags: Vec<&'a str>,
    priority: i32,
    can_rollback: bool,
    batch_size: usize,
}

impl<'a> From<&'a SeederDefinition> for HashedMetadata<'a> {
    fn from(definition: &'a SeederDefinition) -> Self {
        Self {
            name: &definition.name,
            description: &definition.description,
            environments: definition.environments.iter().map(String::as_str).collect(),
            dependencies: definition.dependencies.iter().map(String::as_str).collect(),
            tags: definition.tags.iter().map(String::as_str).collect(),
            priority: definition.priority,
            can_rollback: definition.can_rollback,
            batch_size: definition.batch_size,
        }
    }
}

/// Computes the hex encoded SHA-256 fingerprint of a seeder's logic and metadata.
///
/// The logic payload is length prefixed so that moving bytes between the payload and the
/// metadata can never produce the same digest. The stored `content_hash` of the
/// definition is ignored.
pub fn content_hash(logic: &[u8], definition: &SeederDefinition) -> Result<String, SeedError> {
    let metadata = to_canonical_json_bytes(&HashedMetadata::from(definition))?;
    let mut hasher = Sha256::new();
    hasher.update(b"seeder-logic");
    hasher.update((logic.len() as u64).to_le_bytes());
    hasher.update(logic);
    hasher.update(b"seeder-metadata");
    hasher.update((metadata.len() as u64).to_le_bytes());
    hasher.update(&metadata);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Returns a copy of `definition` with its content hash computed from `logic`.
pub fn seal(logic: &[u8], definition: SeederDefinition) -> Result<SeederDefinition, SeedError> {
    let content_hash = content_hash(logic, &definition)?;
    Ok(SeederDefinition {
        content_hash,
        ..definition
    })
}
