//! Dependency descriptors stored next to artifacts.
//!
//! An artifact `lib-1.0.jar` may be accompanied by `lib-1.0.deps.toml`:
//!
//! ```toml
//! dependencies = [
//!     "org.example:util:2.0",
//!     { group-id = "org.slf4j", artifact-id = "slf4j-api", version = "[1.7,2.0)", scope = "runtime" },
//! ]
//!
//! [[repositories]]
//! id = "extra"
//! url = "file:///srv/extra-repo"
//! ```
//!
//! Descriptors are looked up in the local repository first and then in every
//! file based remote, in order. An artifact without a descriptor declares
//! nothing.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::debug;

use mvnr_cache::LocalRepository;
use mvnr_config::document::parse_document;
use mvnr_config::{DependencySpec, RepositorySpec};
use mvnr_core::error::{MvnrError, MvnrResult};
use mvnr_core::types::{ArtifactCoordinate, Version};
use mvnr_repository::{directory_of, ArtifactRepository};
use mvnr_resolver::{MetadataSource, ResolutionGroup};

/// Suffix replacing the artifact extension in a descriptor file name
pub const DESCRIPTOR_SUFFIX: &str = "deps.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Descriptor {
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
    #[serde(default)]
    repositories: Vec<RepositorySpec>,
}

/// Reads `*.deps.toml` descriptors from the local repository and file based
/// remotes
#[derive(Debug, Clone)]
pub struct DescriptorMetadataSource {
    local: LocalRepository,
}

impl DescriptorMetadataSource {
    pub fn new(local: LocalRepository) -> Self {
        Self { local }
    }

    pub fn descriptor_name(coordinate: &ArtifactCoordinate) -> String {
        format!("{}-{}.{DESCRIPTOR_SUFFIX}", coordinate.artifact_id, coordinate.version)
    }

    /// Repository roots searched, local first
    fn roots(&self, repositories: &[ArtifactRepository]) -> Vec<Utf8PathBuf> {
        std::iter::once(self.local.root().to_path_buf())
            .chain(repositories.iter().filter_map(ArtifactRepository::base_dir))
            .collect()
    }

    fn locate(&self, coordinate: &ArtifactCoordinate, repositories: &[ArtifactRepository]) -> Option<Utf8PathBuf> {
        let relative = directory_of(coordinate).join(Self::descriptor_name(coordinate));
        self.roots(repositories)
            .into_iter()
            .map(|root| root.join(&relative))
            .find(|path| path.is_file())
    }

    fn read(coordinate: &ArtifactCoordinate, path: &Utf8Path) -> MvnrResult<ResolutionGroup> {
        let content = fs::read_to_string(path).map_err(|e| {
            MvnrError::resolution(coordinate.to_string(), format!("failed to read {path}"), e)
        })?;
        let descriptor: Descriptor = parse_document(path.as_str(), &content)?;

        let dependencies = descriptor
            .dependencies
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.to_dependency(&format!("dependencies[{i}]")))
            .collect::<MvnrResult<Vec<_>>>()?;
        let repositories = descriptor
            .repositories
            .iter()
            .map(RepositorySpec::to_repository)
            .collect::<MvnrResult<Vec<_>>>()?;
        Ok(ResolutionGroup {
            dependencies,
            repositories,
        })
    }
}

impl MetadataSource for DescriptorMetadataSource {
    fn related_dependencies(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[ArtifactRepository],
    ) -> MvnrResult<ResolutionGroup> {
        match self.locate(coordinate, repositories) {
            Some(path) => {
                debug!("reading descriptor {path}");
                Self::read(coordinate, &path)
            },
            None => {
                debug!("no descriptor for {coordinate}");
                Ok(ResolutionGroup::default())
            },
        }
    }

    fn available_versions(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[ArtifactRepository],
    ) -> MvnrResult<Vec<Version>> {
        let directory = directory_of(coordinate);
        let Some(artifact_dir) = directory.parent() else {
            return Ok(Vec::new());
        };

        let mut versions = Vec::new();
        for root in self.roots(repositories) {
            let Ok(entries) = fs::read_dir(root.join(artifact_dir)) else {
                continue;
            };
            for entry in entries.flatten() {
                if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                if let Some(version) = entry.file_name().to_str().and_then(|name| name.parse::<Version>().ok()) {
                    versions.push(version);
                }
            }
        }
        versions.sort();
        versions.dedup();
        Ok(versions)
    }
}
