//! Utility functions and helpers.
//!
//! Common functionality used across multiple mvnr crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{parse_checksum_file, sha1_file, sha1_hex, verify_checksum};
pub use path::{is_safe_path, normalize_path, safe_join};
