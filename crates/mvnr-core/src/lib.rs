//! # mvnr-core
//!
//! Core types and utilities shared across all mvnr crates.
//!
//! This crate provides:
//! - Artifact coordinates and the keys used to identify "the same" artifact
//! - Dependency declarations with scopes, exclusions and system paths
//! - Maven version ordering and version ranges
//! - MvnrError enum for unified error handling
//! - Path and checksum helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (ArtifactCoordinate, Dependency, Scope, Version, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{MvnrError, MvnrResult};
pub use types::{
    ArtifactCoordinate, ConflictId, Dependency, Exclusion, ManagementKey, Scope, Version,
    VersionRange,
};
