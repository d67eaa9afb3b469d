//! When each artifact was last checked against each remote repository.
//!
//! Every artifact directory in the local repository may hold a
//! `resolver-status.json` mapping `<file name>@<repository>` to the time of
//! the last remote check and, if that check failed, why. Update policies are
//! evaluated against these records.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use tracing::{trace, warn};

use mvnr_core::error::MvnrError;
use mvnr_repository::{ArtifactRepository, RepositoryPolicy};

use crate::lock::LockTable;
use crate::CacheResult;

/// Name of the per-directory record file
pub const STATUS_FILE_NAME: &str = "resolver-status.json";

/// Outcome of one remote check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCheck {
    /// Epoch milliseconds
    pub last_checked: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateCheck {
    pub fn new(at: DateTime<Utc>, error: Option<String>) -> Self {
        Self {
            last_checked: at.timestamp_millis(),
            error,
        }
    }

    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_checked)
    }
}

type StatusRecords = BTreeMap<String, UpdateCheck>;

/// Process-wide cache of the record files, safe for concurrent use
#[derive(Debug, Default)]
pub struct UpdateCheckIndex {
    records: DashMap<Utf8PathBuf, StatusRecords>,
    locks: LockTable,
}

impl UpdateCheckIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record of the last check of `file` against `repository`
    pub fn last_check(
        &self,
        file: &Utf8Path,
        repository: &ArtifactRepository,
    ) -> CacheResult<Option<UpdateCheck>> {
        let status = status_path(file)?;
        let key = record_key(file, repository);
        if let Some(records) = self.records.get(&status) {
            return Ok(records.get(&key).cloned());
        }
        let records = load(&status)?;
        let check = records.get(&key).cloned();
        self.records.entry(status).or_insert(records);
        Ok(check)
    }

    /// Whether `policy` wants `file` checked against `repository` again
    pub fn is_update_required(
        &self,
        file: &Utf8Path,
        repository: &ArtifactRepository,
        policy: &RepositoryPolicy,
        now: DateTime<Utc>,
    ) -> CacheResult<bool> {
        let last = self.last_check(file, repository)?.and_then(|c| c.checked_at());
        Ok(policy.is_update_required(last, now))
    }

    /// Error remembered from the last check, if it failed
    pub fn cached_error(
        &self,
        file: &Utf8Path,
        repository: &ArtifactRepository,
    ) -> CacheResult<Option<String>> {
        Ok(self.last_check(file, repository)?.and_then(|c| c.error))
    }

    /// Record a check of `file` against `repository` made at `now`
    pub fn touch(
        &self,
        file: &Utf8Path,
        repository: &ArtifactRepository,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        let status = status_path(file)?;
        let _guard = self.locks.lock(&status);

        // Another process may have written since we cached the file
        let mut records = load(&status)?;
        records.insert(
            record_key(file, repository),
            UpdateCheck::new(now, error.map(str::to_string)),
        );
        store(&status, &records)?;
        trace!("touched {} for {}", file, repository.id);
        self.records.insert(status, records);
        Ok(())
    }

    /// Drop every cached record file; the next lookup re-reads disk
    pub fn clear(&self) {
        self.records.clear();
    }
}

fn status_path(file: &Utf8Path) -> CacheResult<Utf8PathBuf> {
    file.parent()
        .map(|dir| dir.join(STATUS_FILE_NAME))
        .ok_or_else(|| MvnrError::malformed(file.as_str(), "has no parent directory"))
}

fn record_key(file: &Utf8Path, repository: &ArtifactRepository) -> String {
    format!(
        "{}@{}|{}",
        file.file_name().unwrap_or_default(),
        repository.id,
        repository.repository_key()
    )
}

fn load(status: &Utf8Path) -> CacheResult<StatusRecords> {
    let contents = match fs::read_to_string(status) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StatusRecords::new()),
        Err(e) => return Err(MvnrError::io(format!("Failed to read {status}"), e)),
    };
    match serde_json::from_str(&contents) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!("ignoring unreadable {}: {}", status, e);
            Ok(StatusRecords::new())
        },
    }
}

fn store(status: &Utf8Path, records: &StatusRecords) -> CacheResult<()> {
    if let Some(parent) = status.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| MvnrError::io(format!("Failed to create {parent}"), e))?;
    }
    let contents = serde_json::to_string_pretty(records).map_err(|e| {
        MvnrError::io(
            format!("Failed to serialize {status}"),
            std::io::Error::new(ErrorKind::InvalidData, e),
        )
    })?;
    let scratch = Utf8PathBuf::from(format!("{status}.{}.part", std::process::id()));
    fs::write(&scratch, contents)
        .map_err(|e| MvnrError::io(format!("Failed to write {scratch}"), e))?;
    fs::rename(&scratch, status).map_err(|e| {
        let _ = fs::remove_file(&scratch);
        MvnrError::io(format!("Failed to write {status}"), e)
    })
}

#[cfg(test)]
mod tests;
