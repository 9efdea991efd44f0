//! Canonical JSON helpers used for hashing and persisted payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{ErrorInfo, SeedError};

/// Serializes `value` to JSON bytes with object keys sorted at every level.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SeedError> {
    let value = serde_json::to_value(value)
        .map_err(|err| SeedError::Serde(ErrorInfo::new("json-serialize", err.to_string())))?;
    serde_json::to_vec(&canonicalize(value))
        .map_err(|err| SeedError::Serde(ErrorInfo::new("json-serialize", err.to_string())))
}

/// Parses JSON bytes into `T`.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SeedError> {
    serde_json::from_slice(bytes)
        .map_err(|err| SeedError::Serde(ErrorInfo::new("json-deserialize", err.to_string())))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
