use std::collections::{BTreeMap, BTreeSet, VecDeque};

use seed_core::{SeedError, SeederDefinition};

/// Dependency graph over a set of definitions, validated on construction.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    nodes: BTreeMap<&'a str, &'a SeederDefinition>,
    dependents: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds the graph, failing on the first unknown dependency.
    ///
    /// Definitions are checked in name order and their dependencies in name order, so the
    /// reported pair is stable for a given input.
    pub fn build<I>(definitions: I) -> Result<Self, SeedError>
    where
        I: IntoIterator<Item = &'a SeederDefinition>,
    {
        let mut nodes = BTreeMap::new();
        for definition in definitions {
            if nodes.insert(definition.name.as_str(), definition).is_some() {
                return Err(SeedError::duplicate_name(&definition.name));
            }
        }
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (&name, &definition) in &nodes {
            for dependency in &definition.dependencies {
                if !nodes.contains_key(dependency.as_str()) {
                    return Err(SeedError::unknown_dependency(name, dependency));
                }
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .insert(name);
            }
        }
        Ok(Self { nodes, dependents })
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic topological order.
    ///
    /// Among all nodes whose dependencies are already emitted, the one with the lowest
    /// priority goes next, ties broken by ascending name. Either every node is ordered or
    /// the call fails with the full set of nodes that could not be ordered.
    pub fn order(&self) -> Result<Vec<String>, SeedError> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, definition)| (*name, definition.dependencies.len()))
            .collect();
        let mut ready: BTreeSet<(i32, &str)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| (self.nodes[name].priority, *name))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.iter().next().copied() {
            ready.remove(&next);
            let (_, name) = next;
            order.push(name.to_string());
            in_degree.remove(name);
            if let Some(dependents) = self.dependents.get(name) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert((self.nodes[dependent].priority, *dependent));
                        }
                    }
                }
            }
        }
        if !in_degree.is_empty() {
            let remaining: Vec<String> = in_degree.keys().map(|name| name.to_string()).collect();
            let mut edges = Vec::new();
            for name in in_degree.keys() {
                for dependency in &self.nodes[name].dependencies {
                    if in_degree.contains_key(dependency.as_str()) {
                        edges.push((dependency.clone(), name.to_string()));
                    }
                }
            }
            tracing::error!(remaining = %remaining.join(","), "dependency cycle detected");
            return Err(SeedError::cyclic_dependency(&remaining, &edges));
        }
        Ok(order)
    }

    /// `roots` plus every seeder they transitively depend on.
    pub fn dependency_closure<S: AsRef<str>>(
        &self,
        roots: &[S],
    ) -> Result<BTreeSet<String>, SeedError> {
        let mut closure = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for root in roots {
            let root = root.as_ref();
            let (&name, _) = self
                .nodes
                .get_key_value(root)
                .ok_or_else(|| SeedError::unknown_seeder(root))?;
            queue.push_back(name);
        }
        while let Some(name) = queue.pop_front() {
            if !closure.insert(name.to_string()) {
                continue;
            }
            for dependency in &self.nodes[name].dependencies {
                queue.push_back(dependency.as_str());
            }
        }
        Ok(closure)
    }
}

/// Resolves the full execution order of `definitions`.
pub fn resolve<'a, I>(definitions: I) -> Result<Vec<String>, SeedError>
where
    I: IntoIterator<Item = &'a SeederDefinition>,
{
    let graph = DependencyGraph::build(definitions)?;
    let order = graph.order()?;
    tracing::debug!(seeders = order.len(), "resolved execution order");
    Ok(order)
}

/// Resolves the full set, then keeps only the members of `subset`.
///
/// Dependencies are validated and ordered against every definition, so a dependency
/// excluded from the subset still constrains the relative order of its dependents.
pub fn resolve_subset<'a, I>(
    definitions: I,
    subset: &BTreeSet<String>,
) -> Result<Vec<String>, SeedError>
where
    I: IntoIterator<Item = &'a SeederDefinition>,
{
    let order = resolve(definitions)?;
    Ok(order
        .into_iter()
        .filter(|name| subset.contains(name))
        .collect())
}
