//! Local artifact storage for mvnr
//!
//! This crate owns everything that touches the local repository on disk:
//! where an artifact lives, how a download is installed atomically, the
//! per-coordinate locks that keep concurrent resolvers from writing the same
//! file, and the persisted record of when each artifact was last checked
//! against each remote repository.

pub mod local;
pub mod lock;
pub mod registry;
pub mod status;

// Re-export main types
pub use local::LocalRepository;
pub use lock::{LockTable, PathLock};
pub use registry::RepositoryRegistry;
pub use status::{UpdateCheck, UpdateCheckIndex, STATUS_FILE_NAME};

use mvnr_core::error::MvnrError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, MvnrError>;
