//! Making artifact files present in the local repository
//!
//! The local repository is consulted first. Remote repositories are only
//! contacted on a miss, when the caller forces a refresh, or when a
//! `-SNAPSHOT` artifact is due for an update check under some repository's
//! snapshot policy. Downloads are written to a scratch file, verified and
//! renamed into place under a per-path lock.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use mvnr_cache::RepositoryRegistry;
use mvnr_core::error::MvnrError;
use mvnr_core::types::{ArtifactCoordinate, Scope};
use mvnr_core::utils::verify_checksum;
use mvnr_repository::{ArtifactRepository, ChecksumPolicy, RepositoryPolicy, Transport};

use crate::cancel::CancellationToken;
use crate::capability::{Resolvable, Versioned};
use crate::graph::GraphNode;
use crate::ResolverResult;

mod state;

pub use state::ResolutionState;

/// Record of an artifact found on disk, kept apart from the collected tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub scope: Scope,
    pub state: ResolutionState,
    pub file: Option<Utf8PathBuf>,
    /// Repository the file was downloaded from, if it was downloaded
    pub repository: Option<String>,
}

impl Versioned for ResolvedArtifact {
    fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }
}

impl Resolvable for ResolvedArtifact {
    fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }
}

/// What to resolve and where it may come from
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub coordinate: ArtifactCoordinate,
    pub scope: Scope,
    pub system_path: Option<Utf8PathBuf>,
    /// Repositories visible to the artifact; the registry's remotes when empty
    pub repositories: Vec<ArtifactRepository>,
    /// Only this repository is tried when set
    pub pinned_repository: Option<String>,
    /// Fetch even when a local copy exists
    pub force: bool,
}

impl ArtifactRequest {
    pub fn new(coordinate: ArtifactCoordinate) -> Self {
        Self {
            coordinate,
            scope: Scope::Compile,
            system_path: None,
            repositories: Vec::new(),
            pinned_repository: None,
            force: false,
        }
    }

    /// Request for a collected node, with the repositories visible there
    pub fn from_node(node: &GraphNode) -> Self {
        Self {
            coordinate: node.coordinate.clone(),
            scope: node.scope,
            system_path: node.system_path().map(Utf8Path::to_path_buf),
            repositories: node.repositories.clone(),
            pinned_repository: None,
            force: false,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_system_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.scope = Scope::System;
        self.system_path = Some(path.into());
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<ArtifactRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn pinned_to(mut self, repository: impl Into<String>) -> Self {
        self.pinned_repository = Some(repository.into());
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Why a fetch is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchReason {
    Missing,
    Forced,
    SnapshotUpdate,
}

/// Resolves single artifacts against a repository registry
#[derive(Clone)]
pub struct ArtifactResolver {
    registry: RepositoryRegistry,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl fmt::Debug for ArtifactResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactResolver")
            .field("registry", &self.registry)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl ArtifactResolver {
    pub fn new(registry: RepositoryRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    /// Make the requested artifact present locally.
    ///
    /// Fails with `NotFound` when every repository tried confirmed the
    /// artifact absent, or when a fetch is needed while offline, and with the
    /// transfer error otherwise.
    pub fn resolve(&self, request: &ArtifactRequest) -> ResolverResult<ResolvedArtifact> {
        self.cancel.check()?;
        let coordinate = &request.coordinate;
        let mut state = ResolutionState::Unresolved;

        if request.scope == Scope::System {
            return self.resolve_system(request, state);
        }
        coordinate.validate()?;

        let destination = self.registry.path_of(coordinate)?;
        let local_exists = destination.is_file();
        let now = Utc::now();
        let mut candidates = self.candidates(request);

        let reason = if request.force {
            Some(FetchReason::Forced)
        } else if !local_exists {
            Some(FetchReason::Missing)
        } else if coordinate.is_snapshot() && !coordinate.is_timestamped_snapshot() {
            let mut due = Vec::with_capacity(candidates.len());
            for repository in candidates {
                if self.update_due(&destination, &repository, &repository.snapshots, now)? {
                    due.push(repository);
                } else {
                    trace!("{} is up to date for {}", coordinate, repository.id);
                }
            }
            candidates = due;
            (!candidates.is_empty()).then_some(FetchReason::SnapshotUpdate)
        } else {
            None
        };

        let Some(reason) = reason else {
            debug!("{} found locally at {}", coordinate, destination);
            state.advance(ResolutionState::Resolved)?;
            return Ok(self.finish(request, destination, None, state));
        };

        if !self.registry.is_online() {
            if local_exists && reason == FetchReason::SnapshotUpdate {
                debug!("offline, using local {}", destination);
                state.advance(ResolutionState::Resolved)?;
                return Ok(self.finish(request, destination, None, state));
            }
            state.advance(ResolutionState::NotFound)?;
            return Err(MvnrError::not_found(
                coordinate.to_string(),
                "a download is required but the repository system is offline",
            ));
        }

        state.advance(ResolutionState::Fetching)?;
        let _guard = self.registry.locks().lock(&destination);
        if reason == FetchReason::Missing && destination.is_file() {
            trace!("{} was installed while waiting for the lock", destination);
            state.advance(ResolutionState::Resolved)?;
            return Ok(self.finish(request, destination, None, state));
        }

        self.fetch(request, &destination, candidates, reason, now, state)
    }

    fn resolve_system(
        &self,
        request: &ArtifactRequest,
        mut state: ResolutionState,
    ) -> ResolverResult<ResolvedArtifact> {
        let coordinate = &request.coordinate;
        let Some(path) = &request.system_path else {
            return Err(MvnrError::malformed(
                coordinate.to_string(),
                "system scope requires a system path",
            ));
        };
        if !path.is_file() {
            state.advance(ResolutionState::NotFound)?;
            return Err(MvnrError::not_found(
                coordinate.to_string(),
                format!("system path {path} does not exist"),
            ));
        }
        state.advance(ResolutionState::Resolved)?;
        Ok(ResolvedArtifact {
            coordinate: coordinate.clone(),
            scope: Scope::System,
            state,
            file: Some(path.clone()),
            repository: None,
        })
    }

    /// Remote repositories to try, in order
    fn candidates(&self, request: &ArtifactRequest) -> Vec<ArtifactRepository> {
        let declared = if request.repositories.is_empty() {
            self.registry.remotes()
        } else {
            request.repositories.as_slice()
        };
        self.registry
            .effective_remotes(declared)
            .into_iter()
            .filter(|repository| match &request.pinned_repository {
                Some(id) => repository.id == *id || repository.mirrored_ids().contains(&id.as_str()),
                None => true,
            })
            .filter(|repository| repository.policy_for(&request.coordinate).enabled)
            .collect()
    }

    /// Whether `policy` wants `file` checked against `repository` again.
    ///
    /// An existing file counts as checked when it was last modified.
    fn update_due(
        &self,
        file: &Utf8Path,
        repository: &ArtifactRepository,
        policy: &RepositoryPolicy,
        now: DateTime<Utc>,
    ) -> ResolverResult<bool> {
        let recorded = self
            .registry
            .update_checks()
            .last_check(file, repository)?
            .and_then(|check| check.checked_at());
        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let last = match (recorded, modified) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(policy.is_update_required(last, now))
    }

    fn fetch(
        &self,
        request: &ArtifactRequest,
        destination: &Utf8Path,
        candidates: Vec<ArtifactRepository>,
        reason: FetchReason,
        now: DateTime<Utc>,
        mut state: ResolutionState,
    ) -> ResolverResult<ResolvedArtifact> {
        let coordinate = &request.coordinate;
        let local = self.registry.local();
        let checks = self.registry.update_checks();
        let mut absent_from = Vec::new();
        let mut failure: Option<MvnrError> = None;

        for repository in &candidates {
            let policy = repository.policy_for(coordinate);
            if reason == FetchReason::Missing {
                if let Some(error) = checks.cached_error(destination, repository)? {
                    if !self.update_due(destination, repository, policy, now)? {
                        debug!(
                            "{} was not found in {} earlier ({}); not asking again yet",
                            coordinate, repository.id, error
                        );
                        absent_from.push(repository.id.clone());
                        continue;
                    }
                }
            }

            self.cancel.check()?;
            let scratch = local.scratch_path(destination)?;
            match self.transport.fetch(coordinate, repository, &scratch) {
                Ok(()) => {
                    if let Err(error) = self.verify(coordinate, repository, &scratch, policy.checksum_policy) {
                        local.discard(&scratch);
                        warn!("{}", error);
                        failure.get_or_insert(error);
                        continue;
                    }
                    local.install(&scratch, destination)?;
                    checks.touch(destination, repository, None, now)?;
                    info!("downloaded {} from {}", coordinate, repository);
                    state.advance(ResolutionState::Resolved)?;
                    return Ok(self.finish(
                        request,
                        destination.to_path_buf(),
                        Some(repository.id.clone()),
                        state,
                    ));
                },
                Err(error) if error.is_not_found() => {
                    local.discard(&scratch);
                    debug!("{}", error);
                    checks.touch(destination, repository, Some(&error.to_string()), now)?;
                    absent_from.push(repository.id.clone());
                },
                Err(error) => {
                    local.discard(&scratch);
                    warn!("{}", error);
                    failure.get_or_insert(MvnrError::resolution(
                        coordinate.to_string(),
                        format!("could not transfer from {}", repository.id),
                        error,
                    ));
                },
            }
        }

        // A stale snapshot only stands in when every repository confirmed
        // there is nothing newer
        if reason == FetchReason::SnapshotUpdate && failure.is_none() && destination.is_file() {
            debug!("no newer {} available, keeping local copy", coordinate);
            state.advance(ResolutionState::Resolved)?;
            return Ok(self.finish(request, destination.to_path_buf(), None, state));
        }

        match failure {
            Some(error) => {
                state.advance(ResolutionState::Failed)?;
                Err(error)
            },
            None => {
                state.advance(ResolutionState::NotFound)?;
                let message = if absent_from.is_empty() {
                    "no enabled remote repository to download from".to_string()
                } else {
                    format!("not present in {}", absent_from.join(", "))
                };
                Err(MvnrError::not_found(coordinate.to_string(), message))
            },
        }
    }

    /// Compare a downloaded file with the checksum its repository publishes
    fn verify(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
        file: &Utf8Path,
        policy: ChecksumPolicy,
    ) -> ResolverResult<()> {
        if policy == ChecksumPolicy::Ignore {
            return Ok(());
        }
        let expected = match self.transport.fetch_checksum(coordinate, repository) {
            Ok(Some(expected)) => expected,
            Ok(None) => {
                trace!("{} publishes no checksum for {}", repository.id, coordinate);
                return Ok(());
            },
            Err(error) => {
                warn!("could not fetch checksum: {}", error);
                return Ok(());
            },
        };
        match verify_checksum(file, &coordinate.to_string(), &expected) {
            Err(error @ MvnrError::ChecksumMismatch { .. }) if policy == ChecksumPolicy::Warn => {
                warn!("{}", error);
                Ok(())
            },
            other => other,
        }
    }

    /// Build the record for a resolved file, copying timestamped snapshots
    /// to their base-version path
    fn finish(
        &self,
        request: &ArtifactRequest,
        file: Utf8PathBuf,
        repository: Option<String>,
        state: ResolutionState,
    ) -> ResolvedArtifact {
        let coordinate = &request.coordinate;
        if coordinate.is_timestamped_snapshot() {
            let base_missing = self
                .registry
                .path_of(&coordinate.base_coordinate())
                .map_or(true, |base| !base.is_file());
            if repository.is_some() || base_missing {
                match self.registry.local().copy_to_base_version(coordinate, &file) {
                    Ok(Some(base)) => trace!("copied {} to {}", file, base),
                    Ok(None) => {},
                    Err(error) => warn!("could not copy {} to its base version: {}", file, error),
                }
            }
        }
        ResolvedArtifact {
            coordinate: request.coordinate.clone(),
            scope: request.scope,
            state,
            file: Some(file),
            repository,
        }
    }
}

#[cfg(test)]
mod tests;
