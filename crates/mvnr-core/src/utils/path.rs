//! Path utilities for safe file system operations.
//!
//! Repository paths are derived from coordinates supplied by descriptors;
//! these checks keep them inside the repository root.

use crate::error::{MvnrError, MvnrResult};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {},
            Utf8Component::ParentDir => {
                // A leading .. is kept so callers can still see the escape
                match components.last() {
                    Some(Utf8Component::Normal(_)) => {
                        components.pop();
                    },
                    Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {},
                    _ => components.push(component),
                }
            },
            other => components.push(other),
        }
    }

    components.iter().map(|c| c.as_str()).collect()
}

/// Check if a relative path stays below its base (no directory traversal)
pub fn is_safe_path(path: &Utf8Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {},
            Utf8Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Utf8Component::Normal(_) => depth += 1,
            _ => return false,
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Utf8Path, path: &Utf8Path) -> MvnrResult<Utf8PathBuf> {
    if !is_safe_path(path) {
        return Err(MvnrError::malformed(
            path.as_str(),
            format!("path escapes the repository root {base}"),
        ));
    }

    Ok(base.join(normalize_path(path)))
}
