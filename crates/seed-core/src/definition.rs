//! Immutable description of a registered seeder.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Environment label that matches every environment.
pub const ALL_ENVIRONMENTS: &str = "all";

fn default_priority() -> i32 {
    100
}

fn default_batch_size() -> usize {
    1000
}

/// Identity, ordering hints and capabilities of a seeder.
///
/// Set-valued fields are stored as [`BTreeSet`]s so that serialization, and hence the
/// content hash, never depends on declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeederDefinition {
    /// Unique identifier within a registry.
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: String,
    /// Environments the seeder may run in; empty means all environments.
    #[serde(default)]
    pub environments: BTreeSet<String>,
    /// Seeders that must complete before this one is eligible.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Labels used for filtering.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Lower values run earlier among otherwise unordered siblings.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Whether the seeder exposes a rollback body.
    #[serde(default)]
    pub can_rollback: bool,
    /// Advisory batch size handed to the seeder body.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Fingerprint of logic plus metadata, filled in when the registry loads the seeder.
    #[serde(default)]
    pub content_hash: String,
}

impl SeederDefinition {
    /// Creates a definition with default metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            environments: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            tags: BTreeSet::new(),
            priority: default_priority(),
            can_rollback: false,
            batch_size: default_batch_size(),
            content_hash: String::new(),
        }
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds dependencies.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Restricts the environments the seeder applies to.
    pub fn environments<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Adds tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares the rollback capability.
    pub fn rollback(mut self, can_rollback: bool) -> Self {
        self.can_rollback = can_rollback;
        self
    }

    /// Sets the advisory batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns true when the seeder may run in `environment`.
    pub fn applies_to(&self, environment: &str) -> bool {
        self.environments.is_empty()
            || self.environments.contains(ALL_ENVIRONMENTS)
            || self.environments.contains(environment)
    }

    /// Returns true when the seeder carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Returns true when the seeder carries at least one of `tags`.
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag.as_ref()))
    }
}
