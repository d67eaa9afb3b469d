//! Error types and result aliases for mvnr operations.
//!
//! Provides a unified error type that covers every failure the collector,
//! resolver, repositories and configuration layer can report, with
//! actionable suggestions for the CLI.

use thiserror::Error;

/// Unified error type for all mvnr operations
#[derive(Error, Debug)]
pub enum MvnrError {
    // Config errors
    #[error("Failed to parse {file}: {message} at line {line}, column {column}")]
    TomlParse {
        file: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Input errors
    #[error("Malformed input for {what}: {reason}")]
    MalformedInput { what: String, reason: String },

    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    // Resolution errors
    #[error("Artifact {coordinate} not found: {message}")]
    NotFound { coordinate: String, message: String },

    #[error("Failed to resolve {coordinate}: {message}")]
    ResolutionFailure {
        coordinate: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing {} artifact(s): {}", missing.len(), missing.join(", "))]
    MultipleArtifactsNotFound { missing: Vec<String> },

    #[error("Dependency cycle detected: {cycle}")]
    CycleDetected { cycle: String },

    #[error("Version conflict for {key}: kept {kept}, but {rejected} is required by {required_by}")]
    VersionConflict {
        key: String,
        kept: String,
        rejected: String,
        required_by: String,
    },

    #[error("No version of {key} satisfies {range} (available: {available})")]
    OverConstrainedVersion {
        key: String,
        range: String,
        available: String,
    },

    #[error("Checksum mismatch for {coordinate}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        coordinate: String,
        expected: String,
        actual: String,
    },

    #[error("Resolution was cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for mvnr operations
pub type MvnrResult<T> = Result<T, MvnrError>;

impl MvnrError {
    /// Create a resolution failure wrapping a transport or IO error
    pub fn resolution<E>(coordinate: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ResolutionFailure {
            coordinate: coordinate.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a malformed input error
    pub fn malformed(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(coordinate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            coordinate: coordinate.into(),
            message: message.into(),
        }
    }

    /// Whether the resolution may continue past this error.
    ///
    /// A missing artifact can be a legitimate absent optional dependency and
    /// is aggregated rather than failing immediately. Cycles and conflicts are
    /// pruned and recorded.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MvnrError::NotFound { .. }
                | MvnrError::CycleDetected { .. }
                | MvnrError::VersionConflict { .. }
                | MvnrError::OverConstrainedVersion { .. }
        )
    }

    /// Whether this error means the artifact is confirmed absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MvnrError::NotFound { .. } | MvnrError::MultipleArtifactsNotFound { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            MvnrError::NotFound { .. } | MvnrError::MultipleArtifactsNotFound { .. } => Some(
                "Check the coordinates and the configured repositories, or install the artifact locally",
            ),
            MvnrError::ResolutionFailure { .. } => {
                Some("Check repository availability and try again, or run with --offline")
            },
            MvnrError::VersionConflict { .. } | MvnrError::OverConstrainedVersion { .. } => {
                Some("Pin the version in [dependency-management] to settle the conflict")
            },
            MvnrError::CycleDetected { .. } => {
                Some("Add an exclusion to break the cycle between the listed artifacts")
            },
            MvnrError::ChecksumMismatch { .. } => Some(
                "Delete the local copy and retry, or relax the repository checksum-policy",
            ),
            MvnrError::TomlParse { .. } | MvnrError::ConfigValidation { .. } => {
                Some("Run 'mvnr check' to validate the configuration")
            },
            _ => None,
        }
    }
}
