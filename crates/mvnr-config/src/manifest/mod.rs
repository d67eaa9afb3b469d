//! mvnr.toml project manifest parsing and validation

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use mvnr_core::error::MvnrError;
use mvnr_core::types::{ArtifactCoordinate, Dependency, Exclusion, Scope, VersionRange};
use mvnr_repository::{ArtifactRepository, Authentication, ChecksumPolicy, RepositoryPolicy, UpdatePolicy};

use crate::document::{invalid, parse_document};
use crate::ConfigResult;

/// Manifest file name looked up by the loader
pub const MANIFEST_FILE: &str = "mvnr.toml";

/// Complete mvnr.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    /// The artifact being resolved for
    pub project: ProjectSection,

    /// Direct dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// Versions and scopes imposed on the whole graph
    #[serde(default)]
    pub dependency_management: Vec<DependencySpec>,

    /// Remote repositories, searched in order before those from settings
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,
}

/// Project identity section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectSection {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,

    /// Artifact extension, `jar` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dependency specification: a `groupId:artifactId[:ext[:classifier]]:version`
/// string or a detailed table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Simple(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetailedDependency {
    pub group_id: String,
    pub artifact_id: String,

    /// Version or range; may be omitted when dependency management supplies it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub optional: bool,

    /// `groupId:artifactId` patterns, either half may be `*`
    #[serde(default)]
    pub exclusions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_path: Option<Utf8PathBuf>,
}

/// A remote repository declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositorySpec {
    pub id: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<PolicySpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<PolicySpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Release or snapshot policy; omitted fields take the defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_policy: Option<String>,
}

impl Manifest {
    /// Coordinate of the project itself
    pub fn root(&self) -> ArtifactCoordinate {
        let project = &self.project;
        let root = ArtifactCoordinate::new(&project.group_id, &project.artifact_id, &project.version);
        match &project.packaging {
            Some(packaging) => root.with_extension(packaging),
            None => root,
        }
    }

    /// Direct dependencies in declaration order
    pub fn dependencies(&self) -> ConfigResult<Vec<Dependency>> {
        self.dependencies
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.to_dependency(&format!("dependencies[{i}]")))
            .collect()
    }

    pub fn managed_dependencies(&self) -> ConfigResult<Vec<Dependency>> {
        self.dependency_management
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.to_dependency(&format!("dependency-management[{i}]")))
            .collect()
    }

    pub fn repositories(&self) -> ConfigResult<Vec<ArtifactRepository>> {
        self.repositories.iter().map(RepositorySpec::to_repository).collect()
    }
}

impl DependencySpec {
    /// Convert to a dependency, `field` naming it in validation errors
    pub fn to_dependency(&self, field: &str) -> ConfigResult<Dependency> {
        match self {
            DependencySpec::Simple(coordinate) => {
                let coordinate: ArtifactCoordinate = coordinate
                    .parse()
                    .map_err(|e: MvnrError| invalid(field, e.to_string()))?;
                check_version(field, &coordinate.version)?;
                Ok(Dependency::new(coordinate))
            },
            DependencySpec::Detailed(detailed) => detailed.to_dependency(field),
        }
    }
}

impl DetailedDependency {
    fn to_dependency(&self, field: &str) -> ConfigResult<Dependency> {
        if self.group_id.trim().is_empty() {
            return Err(invalid(format!("{field}.group-id"), "must not be empty"));
        }
        if self.artifact_id.trim().is_empty() {
            return Err(invalid(format!("{field}.artifact-id"), "must not be empty"));
        }

        let version = self.version.as_deref().unwrap_or_default();
        if !version.trim().is_empty() {
            check_version(field, version)?;
        }

        let mut coordinate = ArtifactCoordinate::new(&self.group_id, &self.artifact_id, version);
        if let Some(extension) = &self.extension {
            coordinate = coordinate.with_extension(extension);
        }
        if let Some(classifier) = &self.classifier {
            coordinate = coordinate.with_classifier(classifier);
        }

        let mut dependency = Dependency::new(coordinate);
        if let Some(scope) = &self.scope {
            let scope: Scope = scope
                .parse()
                .map_err(|reason: String| invalid(format!("{field}.scope"), reason))?;
            dependency = dependency.with_scope(scope);
        }
        match (&self.system_path, dependency.scope) {
            (Some(path), Some(Scope::System)) => dependency.system_path = Some(path.clone()),
            (Some(_), _) => {
                return Err(invalid(
                    format!("{field}.system-path"),
                    "only allowed with scope \"system\"",
                ))
            },
            (None, Some(Scope::System)) => {
                return Err(invalid(
                    format!("{field}.system-path"),
                    "required for scope \"system\"",
                ))
            },
            (None, _) => {},
        }
        if self.optional {
            dependency = dependency.optional();
        }
        for exclusion in &self.exclusions {
            let exclusion: Exclusion = exclusion
                .parse()
                .map_err(|e: MvnrError| invalid(format!("{field}.exclusions"), e.to_string()))?;
            dependency = dependency.exclude(exclusion);
        }
        Ok(dependency)
    }
}

fn check_version(field: &str, version: &str) -> ConfigResult<()> {
    VersionRange::parse(version)
        .map(|_| ())
        .map_err(|e| invalid(format!("{field}.version"), e.to_string()))
}

impl RepositorySpec {
    pub fn to_repository(&self) -> ConfigResult<ArtifactRepository> {
        let field = format!("repositories.{}", self.id);
        if self.id.trim().is_empty() {
            return Err(invalid("repositories.id", "must not be empty"));
        }
        url::Url::parse(&self.url).map_err(|e| invalid(format!("{field}.url"), e.to_string()))?;

        let mut repository = ArtifactRepository::new(&self.id, &self.url);
        if let Some(releases) = &self.releases {
            repository = repository.with_releases(releases.to_policy(&format!("{field}.releases"))?);
        }
        if let Some(snapshots) = &self.snapshots {
            repository = repository.with_snapshots(snapshots.to_policy(&format!("{field}.snapshots"))?);
        }
        if let Some(username) = &self.username {
            repository = repository.with_authentication(Authentication {
                username: username.clone(),
                password: self.password.clone(),
            });
        }
        Ok(repository)
    }
}

impl PolicySpec {
    fn to_policy(&self, field: &str) -> ConfigResult<RepositoryPolicy> {
        let defaults = RepositoryPolicy::default();
        let update_policy = match &self.update_policy {
            Some(policy) => policy
                .parse::<UpdatePolicy>()
                .map_err(|e| invalid(format!("{field}.update-policy"), e.to_string()))?,
            None => defaults.update_policy,
        };
        let checksum_policy = match &self.checksum_policy {
            Some(policy) => policy
                .parse::<ChecksumPolicy>()
                .map_err(|e| invalid(format!("{field}.checksum-policy"), e.to_string()))?,
            None => defaults.checksum_policy,
        };
        Ok(RepositoryPolicy::new(
            self.enabled.unwrap_or(defaults.enabled),
            update_policy,
            checksum_policy,
        ))
    }
}

/// Parse an mvnr.toml document
pub fn parse_manifest(content: &str) -> ConfigResult<Manifest> {
    parse_manifest_named(MANIFEST_FILE, content)
}

fn parse_manifest_named(file: &str, content: &str) -> ConfigResult<Manifest> {
    let manifest: Manifest = parse_document(file, content)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Check everything `parse_manifest` accepts syntactically but the
/// resolver would reject
pub fn validate_manifest(manifest: &Manifest) -> ConfigResult<()> {
    let root = manifest.root();
    root.validate()
        .map_err(|e| invalid("project", e.to_string()))?;

    manifest.dependencies()?;
    manifest.managed_dependencies()?;
    validate_repositories(&manifest.repositories)?;
    Ok(())
}

pub(crate) fn validate_repositories(repositories: &[RepositorySpec]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for repository in repositories {
        repository.to_repository()?;
        if !seen.insert(repository.id.as_str()) {
            return Err(invalid(
                format!("repositories.{}", repository.id),
                "repository ids must be unique",
            ));
        }
    }
    Ok(())
}

/// Load and validate mvnr.toml from `path`
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<Manifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MvnrError::io(format!("Failed to read {path}"), e))?;
    parse_manifest_named(path.as_str(), &content)
}
