//! Where the collector learns what an artifact depends on

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use mvnr_core::error::{MvnrError, MvnrResult};
use mvnr_core::types::{ArtifactCoordinate, Dependency, ManagementKey, Version};
use mvnr_repository::ArtifactRepository;

/// Declared dependencies of one artifact plus any repositories its
/// descriptor adds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionGroup {
    pub dependencies: Vec<Dependency>,
    pub repositories: Vec<ArtifactRepository>,
}

impl ResolutionGroup {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        Self {
            dependencies,
            repositories: Vec::new(),
        }
    }
}

/// Descriptor lookups used by the collector. Implementations may block.
pub trait MetadataSource: Send + Sync {
    /// Dependencies `coordinate` declares, in declaration order
    fn related_dependencies(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[ArtifactRepository],
    ) -> MvnrResult<ResolutionGroup>;

    /// Versions of the artifact that exist, in any order
    fn available_versions(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[ArtifactRepository],
    ) -> MvnrResult<Vec<Version>>;
}

/// Metadata held in memory; artifacts without an entry declare nothing
#[derive(Debug, Default)]
pub struct InMemoryMetadataSource {
    groups: HashMap<(ManagementKey, String), ResolutionGroup>,
    versions: HashMap<ManagementKey, Vec<Version>>,
    failures: HashMap<(ManagementKey, String), String>,
    lookups: AtomicUsize,
}

impl InMemoryMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the dependencies of `coordinate`
    pub fn with(mut self, coordinate: &ArtifactCoordinate, dependencies: Vec<Dependency>) -> Self {
        self.insert(coordinate, ResolutionGroup::new(dependencies));
        self
    }

    pub fn insert(&mut self, coordinate: &ArtifactCoordinate, group: ResolutionGroup) {
        self.add_version(coordinate);
        self.groups.insert(lookup_key(coordinate), group);
    }

    /// Make `coordinate` exist without declaring anything
    pub fn add_version(&mut self, coordinate: &ArtifactCoordinate) {
        if let Ok(version) = coordinate.version.parse::<Version>() {
            let known = self.versions.entry(coordinate.key()).or_default();
            if !known.contains(&version) {
                known.push(version);
            }
        }
    }

    /// Make every lookup of `coordinate` fail with `message`
    pub fn fail(mut self, coordinate: &ArtifactCoordinate, message: impl Into<String>) -> Self {
        self.failures.insert(lookup_key(coordinate), message.into());
        self
    }

    /// Number of dependency lookups served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

fn lookup_key(coordinate: &ArtifactCoordinate) -> (ManagementKey, String) {
    (coordinate.key(), coordinate.version.clone())
}

impl MetadataSource for InMemoryMetadataSource {
    fn related_dependencies(
        &self,
        coordinate: &ArtifactCoordinate,
        _repositories: &[ArtifactRepository],
    ) -> MvnrResult<ResolutionGroup> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = lookup_key(coordinate);
        if let Some(message) = self.failures.get(&key) {
            return Err(MvnrError::resolution(
                coordinate.to_string(),
                "failed to read dependency metadata",
                std::io::Error::new(std::io::ErrorKind::Other, message.clone()),
            ));
        }
        Ok(self.groups.get(&key).cloned().unwrap_or_default())
    }

    fn available_versions(
        &self,
        coordinate: &ArtifactCoordinate,
        _repositories: &[ArtifactRepository],
    ) -> MvnrResult<Vec<Version>> {
        Ok(self.versions.get(&coordinate.key()).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_and_undeclared() {
        let lib = ArtifactCoordinate::new("org.example", "lib", "1.0");
        let util = Dependency::new(ArtifactCoordinate::new("org.example", "util", "2.0"));
        let source = InMemoryMetadataSource::new().with(&lib, vec![util.clone()]);

        let group = source.related_dependencies(&lib, &[]).unwrap();
        assert_eq!(group.dependencies, vec![util]);
        let other = ArtifactCoordinate::new("org.example", "other", "1.0");
        assert!(source.related_dependencies(&other, &[]).unwrap().dependencies.is_empty());
        assert_eq!(source.lookups(), 2);
    }

    #[test]
    fn test_available_versions() {
        let mut source = InMemoryMetadataSource::new();
        for v in ["1.0", "1.5", "2.0", "1.0"] {
            source.add_version(&ArtifactCoordinate::new("g", "a", v));
        }
        let versions = source
            .available_versions(&ArtifactCoordinate::new("g", "a", "[1,2)"), &[])
            .unwrap();
        assert_eq!(versions.len(), 3);
    }

    #[test]
    fn test_failure() {
        let lib = ArtifactCoordinate::new("org.example", "lib", "1.0");
        let source = InMemoryMetadataSource::new().fail(&lib, "corrupt descriptor");
        let err = source.related_dependencies(&lib, &[]).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
