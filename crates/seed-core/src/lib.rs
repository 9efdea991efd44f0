#![deny(missing_docs)]
//! Core types for the seeding engine: seeder definitions, content hashing, the
//! registry and the structured error taxonomy shared by every other crate.

pub mod definition;
pub mod errors;
mod hash;
pub mod registry;
pub mod seeder;
pub mod serde;

pub use definition::{SeederDefinition, ALL_ENVIRONMENTS};
pub use errors::{ErrorInfo, SeedError};
pub use hash::{content_hash, seal};
pub use registry::Registry;
pub use seeder::{BodyError, SeedContext, Seeder, SeederHooks, Transactional};
pub use serde::{from_json_slice, to_canonical_json_bytes};
