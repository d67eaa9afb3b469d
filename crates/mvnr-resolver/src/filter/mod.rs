//! Artifact filters applied to collected nodes

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use mvnr_core::types::{ArtifactCoordinate, Exclusion, Scope};

/// Decides whether an artifact reached with a given scope belongs in the result
pub trait ArtifactFilter: Send + Sync + fmt::Debug {
    fn include(&self, coordinate: &ArtifactCoordinate, scope: Scope) -> bool;
}

/// Classpath view selected by a scope name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    included: BTreeSet<Scope>,
}

impl ScopeFilter {
    /// Scopes visible on the classpath named by `scope`:
    /// - `compile`: compile, provided, system
    /// - `runtime`: compile, runtime
    /// - `test`: everything
    /// - `provided`, `system`: only themselves
    pub fn new(scope: Scope) -> Self {
        use Scope::*;

        let included: &[Scope] = match scope {
            Compile => &[Compile, Provided, System],
            Runtime => &[Compile, Runtime],
            Test => &Scope::ALL,
            Provided => &[Provided],
            System => &[System],
        };
        Self {
            included: included.iter().copied().collect(),
        }
    }

    pub fn includes_scope(&self, scope: Scope) -> bool {
        self.included.contains(&scope)
    }
}

impl ArtifactFilter for ScopeFilter {
    fn include(&self, _coordinate: &ArtifactCoordinate, scope: Scope) -> bool {
        self.includes_scope(scope)
    }
}

/// Rejects artifacts matching any of a set of `groupId:artifactId` patterns
#[derive(Debug, Clone, Default)]
pub struct ExclusionSetFilter {
    exclusions: Vec<Exclusion>,
}

impl ExclusionSetFilter {
    pub fn new(exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        Self {
            exclusions: exclusions.into_iter().collect(),
        }
    }
}

impl ArtifactFilter for ExclusionSetFilter {
    fn include(&self, coordinate: &ArtifactCoordinate, _scope: Scope) -> bool {
        let key = coordinate.key();
        !self.exclusions.iter().any(|e| e.matches(&key))
    }
}

/// Accepts only the listed file extensions
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<S: Into<String>>(extensions: impl IntoIterator<Item = S>) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }
}

impl ArtifactFilter for ExtensionFilter {
    fn include(&self, coordinate: &ArtifactCoordinate, _scope: Scope) -> bool {
        self.extensions.contains(&coordinate.extension)
    }
}

/// Accepts what every member accepts; empty accepts everything
#[derive(Debug, Clone, Default)]
pub struct AndFilter {
    filters: Vec<Arc<dyn ArtifactFilter>>,
}

impl AndFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl ArtifactFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn push(&mut self, filter: Arc<dyn ArtifactFilter>) {
        self.filters.push(filter);
    }
}

impl ArtifactFilter for AndFilter {
    fn include(&self, coordinate: &ArtifactCoordinate, scope: Scope) -> bool {
        self.filters.iter().all(|f| f.include(coordinate, scope))
    }
}
