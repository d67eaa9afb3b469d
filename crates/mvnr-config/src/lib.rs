//! Configuration parsing for mvnr
//!
//! This crate handles parsing and validation of the project manifest
//! (mvnr.toml) and the user's global settings, and merges them with
//! environment and command line overrides into one effective configuration.

pub mod document;
pub mod manifest;
pub mod merge;
pub mod settings;

// Re-export main types
pub use manifest::{DependencySpec, DetailedDependency, Manifest, PolicySpec, ProjectSection, RepositorySpec};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, EffectiveConfig, Setting};
pub use settings::{MirrorSpec, Settings};

use mvnr_core::error::MvnrError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, MvnrError>;
