//! The local repository on disk

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use mvnr_core::error::MvnrError;
use mvnr_core::types::ArtifactCoordinate;
use mvnr_core::utils::safe_join;
use mvnr_repository::layout;

use crate::CacheResult;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Root of the local artifact cache, laid out like a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: Utf8PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path `coordinate` is stored at
    pub fn path_of(&self, coordinate: &ArtifactCoordinate) -> CacheResult<Utf8PathBuf> {
        coordinate.validate()?;
        safe_join(&self.root, &layout::path_of(coordinate))
    }

    /// Absolute directory holding `coordinate` and its update-check record
    pub fn directory_of(&self, coordinate: &ArtifactCoordinate) -> CacheResult<Utf8PathBuf> {
        coordinate.validate()?;
        safe_join(&self.root, &layout::directory_of(coordinate))
    }

    pub fn contains(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.path_of(coordinate).is_ok_and(|path| path.is_file())
    }

    /// Fresh scratch path next to `destination`, so the final rename stays
    /// on one filesystem
    pub fn scratch_path(&self, destination: &Utf8Path) -> CacheResult<Utf8PathBuf> {
        let parent = destination
            .parent()
            .ok_or_else(|| MvnrError::malformed(destination.as_str(), "has no parent directory"))?;
        fs::create_dir_all(parent)
            .map_err(|e| MvnrError::io(format!("Failed to create {parent}"), e))?;

        let name = destination.file_name().unwrap_or("artifact");
        let unique = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        Ok(parent.join(format!(".{name}.{}.{unique}.part", std::process::id())))
    }

    /// Move a finished download into place
    pub fn install(&self, scratch: &Utf8Path, destination: &Utf8Path) -> CacheResult<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MvnrError::io(format!("Failed to create {parent}"), e))?;
        }
        fs::rename(scratch, destination).map_err(|e| {
            let _ = fs::remove_file(scratch);
            MvnrError::io(format!("Failed to install {destination}"), e)
        })?;
        debug!("installed {}", destination);
        Ok(())
    }

    /// Copy a resolved timestamped snapshot to its `-SNAPSHOT` path.
    ///
    /// Returns the base-version path, or `None` when `coordinate` is not a
    /// timestamped snapshot.
    pub fn copy_to_base_version(
        &self,
        coordinate: &ArtifactCoordinate,
        file: &Utf8Path,
    ) -> CacheResult<Option<Utf8PathBuf>> {
        if !coordinate.is_timestamped_snapshot() {
            return Ok(None);
        }
        let base = self.path_of(&coordinate.base_coordinate())?;
        if base == file {
            return Ok(Some(base));
        }
        let scratch = self.scratch_path(&base)?;
        fs::copy(file, &scratch).map_err(|e| {
            let _ = fs::remove_file(&scratch);
            MvnrError::io(format!("Failed to copy {file} to {base}"), e)
        })?;
        self.install(&scratch, &base)?;
        Ok(Some(base))
    }

    /// Discard an abandoned scratch file
    pub fn discard(&self, scratch: &Utf8Path) {
        if scratch.exists() {
            let _ = fs::remove_file(scratch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> LocalRepository {
        LocalRepository::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
    }

    #[test]
    fn test_path_of() {
        let dir = TempDir::new().unwrap();
        let local = repo(&dir);
        let c = ArtifactCoordinate::new("org.example", "lib", "1.0");
        assert_eq!(
            local.path_of(&c).unwrap(),
            local.root().join("org/example/lib/1.0/lib-1.0.jar")
        );
        assert_eq!(local.directory_of(&c).unwrap(), local.root().join("org/example/lib/1.0"));
    }

    #[test]
    fn test_path_of_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let local = repo(&dir);
        let c = ArtifactCoordinate::new("..", "lib", "1.0");
        assert!(local.path_of(&c).is_err());
    }

    #[test]
    fn test_install_moves_scratch_into_place() {
        let dir = TempDir::new().unwrap();
        let local = repo(&dir);
        let c = ArtifactCoordinate::new("g", "a", "1.0");
        let destination = local.path_of(&c).unwrap();

        let scratch = local.scratch_path(&destination).unwrap();
        assert_eq!(scratch.parent(), destination.parent());
        fs::write(&scratch, b"bytes").unwrap();

        assert!(!local.contains(&c));
        local.install(&scratch, &destination).unwrap();
        assert!(local.contains(&c));
        assert!(!scratch.exists());
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = TempDir::new().unwrap();
        let local = repo(&dir);
        let destination = local.root().join("g/a/1.0/a-1.0.jar");
        assert_ne!(
            local.scratch_path(&destination).unwrap(),
            local.scratch_path(&destination).unwrap()
        );
    }

    #[test]
    fn test_copy_to_base_version() {
        let dir = TempDir::new().unwrap();
        let local = repo(&dir);
        let c = ArtifactCoordinate::new("g", "a", "1.0-20240102.030405-6");
        let file = local.path_of(&c).unwrap();
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"snapshot").unwrap();

        let base = local.copy_to_base_version(&c, &file).unwrap().unwrap();
        assert_eq!(base, local.root().join("g/a/1.0-SNAPSHOT/a-1.0-SNAPSHOT.jar"));
        assert_eq!(fs::read(&base).unwrap(), b"snapshot");

        let release = ArtifactCoordinate::new("g", "a", "1.0");
        assert_eq!(local.copy_to_base_version(&release, &file).unwrap(), None);
    }
}
