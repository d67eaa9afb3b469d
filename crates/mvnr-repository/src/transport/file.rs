//! Transport for repositories on the local filesystem

use camino::Utf8Path;
use std::fs;
use std::io::ErrorKind;
use tracing::trace;

use mvnr_core::types::ArtifactCoordinate;
use mvnr_core::utils::parse_checksum_file;

use super::{Transport, TransportError};
use crate::layout::{checksum_path_of, path_of};
use crate::repository::ArtifactRepository;

/// Copies artifacts out of `file://` repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for FileTransport {
    fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
        destination: &Utf8Path,
    ) -> Result<(), TransportError> {
        let base = repository.base_dir().ok_or_else(|| {
            TransportError::failed(
                coordinate,
                repository,
                format!("'{}' is not a file:// repository", repository.url),
            )
        })?;
        let source = base.join(path_of(coordinate));
        trace!("copying {} to {}", source, destination);

        match fs::copy(&source, destination) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TransportError::not_found(coordinate, repository))
            },
            Err(e) => Err(TransportError::failed(
                coordinate,
                repository,
                format!("could not copy {source}"),
            )
            .with_source(e)),
        }
    }

    fn fetch_checksum(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
    ) -> Result<Option<String>, TransportError> {
        let Some(base) = repository.base_dir() else {
            return Ok(None);
        };
        let source = base.join(checksum_path_of(coordinate));
        match fs::read_to_string(&source) {
            Ok(contents) => Ok(parse_checksum_file(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransportError::failed(
                coordinate,
                repository,
                format!("could not read {source}"),
            )
            .with_source(e)),
        }
    }
}
