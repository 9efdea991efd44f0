//! In-memory registry of seeders keyed by unique name.

use std::collections::BTreeMap;
use std::fmt;

use crate::definition::SeederDefinition;
use crate::errors::SeedError;
use crate::hash::seal;
use crate::seeder::Seeder;

struct Entry<S> {
    definition: SeederDefinition,
    seeder: Box<dyn Seeder<S>>,
}

/// Collection of registered seeders preserving insertion order.
pub struct Registry<S> {
    entries: Vec<Entry<S>>,
    index: BTreeMap<String, usize>,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("seeders", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Registry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a seeder, computing its content hash from logic and metadata.
    pub fn register<T>(&mut self, seeder: T) -> Result<&SeederDefinition, SeedError>
    where
        T: Seeder<S> + 'static,
    {
        self.register_boxed(Box::new(seeder))
    }

    /// Registers an already boxed seeder.
    pub fn register_boxed(
        &mut self,
        seeder: Box<dyn Seeder<S>>,
    ) -> Result<&SeederDefinition, SeedError> {
        let declared = seeder.definition();
        if self.index.contains_key(&declared.name) {
            return Err(SeedError::duplicate_name(&declared.name));
        }
        let definition = seal(&seeder.logic(), declared)?;
        tracing::debug!(
            seeder = %definition.name,
            hash = %definition.content_hash,
            "registered seeder"
        );
        let position = self.entries.len();
        self.index.insert(definition.name.clone(), position);
        self.entries.push(Entry { definition, seeder });
        Ok(&self.entries[position].definition)
    }

    /// All definitions in insertion order.
    pub fn all(&self) -> Vec<&SeederDefinition> {
        self.entries.iter().map(|entry| &entry.definition).collect()
    }

    /// Definition registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&SeederDefinition> {
        self.index
            .get(name)
            .map(|&position| &self.entries[position].definition)
    }

    /// Definitions carrying `tag`, in insertion order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<&SeederDefinition> {
        self.all()
            .into_iter()
            .filter(|definition| definition.has_tag(tag))
            .collect()
    }

    /// Definitions applicable to `environment`, in insertion order.
    pub fn find_by_environment(&self, environment: &str) -> Vec<&SeederDefinition> {
        self.all()
            .into_iter()
            .filter(|definition| definition.applies_to(environment))
            .collect()
    }

    /// Executable handle registered under `name`.
    pub fn seeder(&self, name: &str) -> Option<&dyn Seeder<S>> {
        self.index
            .get(name)
            .map(|&position| self.entries[position].seeder.as_ref())
    }

    /// Returns true when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered seeders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
