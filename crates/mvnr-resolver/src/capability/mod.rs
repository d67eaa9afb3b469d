//! Small capability traits shared by the collector's and resolver's records

use camino::Utf8Path;

use mvnr_core::types::{ArtifactCoordinate, ConflictId, Dependency, ManagementKey};

/// Anything that names one version of one artifact
pub trait Versioned {
    fn coordinate(&self) -> &ArtifactCoordinate;

    fn management_key(&self) -> ManagementKey {
        self.coordinate().key()
    }

    fn conflict_id(&self) -> ConflictId {
        self.coordinate().conflict_id()
    }

    fn is_snapshot(&self) -> bool {
        self.coordinate().is_snapshot()
    }
}

/// Anything that may be backed by a file on disk
pub trait Resolvable: Versioned {
    fn file(&self) -> Option<&Utf8Path>;

    fn is_resolved(&self) -> bool {
        self.file().is_some()
    }
}

impl Versioned for ArtifactCoordinate {
    fn coordinate(&self) -> &ArtifactCoordinate {
        self
    }
}

impl Versioned for Dependency {
    fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }
}
