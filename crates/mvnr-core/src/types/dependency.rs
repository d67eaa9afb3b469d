//! Dependency declarations.
//!
//! A `Dependency` is what a project or a dependency descriptor declares:
//! a coordinate whose version may be a range (or empty when dependency
//! management supplies it), an optional scope, exclusions and, for the
//! system scope, a path on disk.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ArtifactCoordinate, ConflictId, ManagementKey, Scope};
use crate::error::MvnrError;

/// Wildcard accepted in either half of an exclusion
pub const WILDCARD: &str = "*";

/// `groupId:artifactId` pattern pruning transitive dependencies
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Exclude every transitive dependency
    pub fn all() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn matches(&self, key: &ManagementKey) -> bool {
        (self.group_id == WILDCARD || self.group_id == key.group_id)
            && (self.artifact_id == WILDCARD || self.artifact_id == key.artifact_id)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for Exclusion {
    type Err = MvnrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((g, a)) if !g.is_empty() && !a.is_empty() && !a.contains(':') => {
                Ok(Exclusion::new(g, a))
            },
            _ => Err(MvnrError::malformed(
                s,
                "exclusions are written groupId:artifactId (either may be '*')",
            )),
        }
    }
}

/// A declared dependency; never mutated by the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Coordinate whose version is the declared specification
    pub coordinate: ArtifactCoordinate,
    /// Declared scope; `None` means compile unless managed
    pub scope: Option<Scope>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
    /// Only meaningful with the system scope
    pub system_path: Option<Utf8PathBuf>,
}

impl Dependency {
    pub fn new(coordinate: ArtifactCoordinate) -> Self {
        Self {
            coordinate,
            scope: None,
            optional: false,
            exclusions: Vec::new(),
            system_path: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn exclude(mut self, exclusion: Exclusion) -> Self {
        if !self.exclusions.contains(&exclusion) {
            self.exclusions.push(exclusion);
        }
        self
    }

    /// System-scoped dependency on a file outside any repository
    pub fn system(coordinate: ArtifactCoordinate, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            system_path: Some(path.into()),
            ..Self::new(coordinate).with_scope(Scope::System)
        }
    }

    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    pub fn key(&self) -> ManagementKey {
        self.coordinate.key()
    }

    pub fn conflict_id(&self) -> ConflictId {
        self.coordinate.conflict_id()
    }

    /// Declared version specification; empty when left to dependency management
    pub fn version_spec(&self) -> &str {
        &self.coordinate.version
    }

    pub fn has_version(&self) -> bool {
        !self.coordinate.version.trim().is_empty()
    }

    /// Whether one of this dependency's exclusions prunes `key`
    pub fn excludes(&self, key: &ManagementKey) -> bool {
        self.exclusions.iter().any(|e| e.matches(key))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.coordinate, self.effective_scope())?;
        if self.optional {
            f.write_str(" optional")?;
        }
        Ok(())
    }
}
