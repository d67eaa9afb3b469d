//! Dependency management: versions and scopes imposed by the root project

use indexmap::IndexMap;

use mvnr_core::types::{Dependency, ManagementKey};

/// Management key to the dependency that overrides it.
///
/// Immutable for the duration of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedVersionMap {
    entries: IndexMap<ManagementKey, Dependency>,
}

impl ManagedVersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declarations; the first declaration of a key wins
    pub fn from_dependencies(dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        let mut map = Self::new();
        for dependency in dependencies {
            map.entries.entry(dependency.key()).or_insert(dependency);
        }
        map
    }

    /// Add or replace the entry for the dependency's key
    pub fn insert(&mut self, dependency: Dependency) -> Option<Dependency> {
        self.entries.insert(dependency.key(), dependency)
    }

    /// Merge an imported management section; existing entries win
    pub fn import(&mut self, imported: &ManagedVersionMap) {
        for (key, dependency) in &imported.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), dependency.clone());
            }
        }
    }

    pub fn get(&self, key: &ManagementKey) -> Option<&Dependency> {
        self.entries.get(key)
    }

    /// Managed version, when the entry pins one
    pub fn version(&self, key: &ManagementKey) -> Option<&str> {
        self.get(key)
            .filter(|d| d.has_version())
            .map(|d| d.version_spec())
    }

    pub fn contains(&self, key: &ManagementKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.values()
    }
}
