//! Core data types for dependency resolution.
//!
//! This module provides the fundamental types used throughout mvnr:
//! - Artifact coordinates and identity keys
//! - Dependency declarations and exclusions
//! - Scopes and the scope-widening table
//! - Maven versions and version ranges

pub mod coordinate;
pub mod dependency;
pub mod range;
pub mod scope;
pub mod version;

// Re-export all public types
pub use coordinate::{ArtifactCoordinate, ConflictId, ManagementKey, DEFAULT_EXTENSION};
pub use dependency::{Dependency, Exclusion};
pub use range::{Restriction, VersionRange};
pub use scope::Scope;
pub use version::{Version, VersionError, SNAPSHOT};
