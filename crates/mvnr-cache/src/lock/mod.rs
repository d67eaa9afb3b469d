//! Per-path critical sections for the local repository

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::sync::Arc;

/// Held while a path in the local repository is being written.
///
/// Releasing the last holder of a path also drops its table entry.
pub struct PathLock<'a> {
    table: &'a LockTable,
    path: Utf8PathBuf,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for PathLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, so a count of one means only the table is left
        self.table.locks.remove_if(&self.path, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// One mutex per destination path, created on first use
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<Utf8PathBuf, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, path: &Utf8Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Block until `path` is free and take it
    pub fn lock(&self, path: &Utf8Path) -> PathLock<'_> {
        let guard = self.mutex(path).lock_arc();
        PathLock {
            table: self,
            path: path.to_path_buf(),
            guard: Some(guard),
        }
    }

    /// Take `path` only if nobody holds it
    pub fn try_lock(&self, path: &Utf8Path) -> Option<PathLock<'_>> {
        let guard = self.mutex(path).try_lock_arc()?;
        Some(PathLock {
            table: self,
            path: path.to_path_buf(),
            guard: Some(guard),
        })
    }

    /// Paths currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
