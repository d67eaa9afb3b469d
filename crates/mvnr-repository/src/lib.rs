//! Repository model for mvnr
//!
//! This crate describes where artifacts come from: remote repository
//! descriptors with their release/snapshot policies, mirror selection,
//! the default repository layout, and the `Transport` seam through which
//! files are fetched.

pub mod layout;
pub mod mirror;
pub mod policy;
pub mod repository;
pub mod transport;

// Re-export main types
pub use layout::{checksum_path_of, directory_of, file_name_of, path_of};
pub use mirror::{apply_mirrors, select_mirror, Mirror};
pub use policy::{ChecksumPolicy, RepositoryPolicy, UpdatePolicy};
pub use repository::{effective_repositories, ArtifactRepository, Authentication, Proxy};
pub use transport::{FileTransport, Transport, TransportError};

use mvnr_core::error::MvnrError;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, MvnrError>;
