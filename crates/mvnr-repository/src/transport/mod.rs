//! Moving artifact files from a remote repository to local disk.
//!
//! The resolver only talks to repositories through [`Transport`], so any
//! protocol can be plugged in. [`FileTransport`] serves `file://`
//! repositories.

use camino::Utf8Path;
use thiserror::Error;

use mvnr_core::types::ArtifactCoordinate;

use crate::repository::ArtifactRepository;

mod file;

pub use file::FileTransport;

/// Why a transfer did not produce the file
#[derive(Error, Debug)]
pub enum TransportError {
    /// The repository answered and does not have the artifact
    #[error("{coordinate} is not present in {repository}")]
    NotFound { coordinate: String, repository: String },

    /// The repository could not be asked, or the transfer broke off
    #[error("transfer of {coordinate} from {repository} failed: {message}")]
    Failed {
        coordinate: String,
        repository: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    pub fn not_found(coordinate: &ArtifactCoordinate, repository: &ArtifactRepository) -> Self {
        Self::NotFound {
            coordinate: coordinate.to_string(),
            repository: repository.id.clone(),
        }
    }

    pub fn failed(
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
        message: impl Into<String>,
    ) -> Self {
        Self::Failed {
            coordinate: coordinate.to_string(),
            repository: repository.id.clone(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            Self::Failed {
                coordinate,
                repository,
                message,
                ..
            } => Self::Failed {
                coordinate,
                repository,
                message,
                source: Some(Box::new(error)),
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Fetches artifact files and their published checksums
pub trait Transport: Send + Sync {
    /// Copy `coordinate` from `repository` to `destination`.
    ///
    /// `destination` is a scratch file owned by the caller; the caller moves
    /// it into place once the transfer is verified.
    fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
        destination: &Utf8Path,
    ) -> Result<(), TransportError>;

    /// Published SHA-1 of `coordinate`, if the repository has one
    fn fetch_checksum(
        &self,
        _coordinate: &ArtifactCoordinate,
        _repository: &ArtifactRepository,
    ) -> Result<Option<String>, TransportError> {
        Ok(None)
    }
}
