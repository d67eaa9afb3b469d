//! The set of repositories a resolution request works against

use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

use mvnr_core::error::MvnrError;
use mvnr_core::types::ArtifactCoordinate;
use mvnr_repository::{apply_mirrors, effective_repositories, ArtifactRepository, Mirror};

use crate::local::LocalRepository;
use crate::lock::LockTable;
use crate::status::UpdateCheckIndex;
use crate::CacheResult;

/// Local repository plus the ordered remote repositories behind it.
///
/// The lock table and update-check store are shared by every clone, so
/// resolvers built from one registry coordinate on the local repository.
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    local: LocalRepository,
    remotes: Vec<ArtifactRepository>,
    mirrors: Vec<Mirror>,
    online: bool,
    locks: Arc<LockTable>,
    update_checks: Arc<UpdateCheckIndex>,
}

impl RepositoryRegistry {
    pub fn new(local: LocalRepository, remotes: Vec<ArtifactRepository>) -> Self {
        Self {
            local,
            remotes: effective_repositories(&remotes),
            mirrors: Vec::new(),
            online: true,
            locks: Arc::new(LockTable::new()),
            update_checks: Arc::new(UpdateCheckIndex::new()),
        }
    }

    pub fn with_mirrors(mut self, mirrors: Vec<Mirror>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn local(&self) -> &LocalRepository {
        &self.local
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    /// Remote repositories as declared, in registry order
    pub fn remotes(&self) -> &[ArtifactRepository] {
        &self.remotes
    }

    /// What is actually contacted for `declared`: mirrors substituted,
    /// duplicates merged, blocked repositories removed
    pub fn effective_remotes(&self, declared: &[ArtifactRepository]) -> Vec<ArtifactRepository> {
        apply_mirrors(declared, &self.mirrors)
            .into_iter()
            .filter(|repository| !repository.blocked)
            .collect()
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn update_checks(&self) -> &UpdateCheckIndex {
        &self.update_checks
    }

    /// Local path of `coordinate`
    pub fn path_of(&self, coordinate: &ArtifactCoordinate) -> CacheResult<Utf8PathBuf> {
        self.local.path_of(coordinate)
    }

    /// Local path of the update-check record covering `coordinate`
    pub fn status_path_of(&self, coordinate: &ArtifactCoordinate) -> CacheResult<Utf8PathBuf> {
        Ok(self.local.directory_of(coordinate)?.join(crate::status::STATUS_FILE_NAME))
    }

    /// Remote repository with the given id
    pub fn remote(&self, id: &str) -> Option<&ArtifactRepository> {
        self.remotes.iter().find(|r| r.id == id)
    }

    /// Refuse a registry that cannot resolve anything
    pub fn validate(&self) -> CacheResult<()> {
        if self.local.root() == Utf8Path::new("") {
            return Err(MvnrError::malformed("local repository", "path is empty"));
        }
        for repository in &self.remotes {
            if repository.id.trim().is_empty() || repository.url.trim().is_empty() {
                return Err(MvnrError::malformed(
                    "remote repository",
                    format!("'{repository}' needs both an id and a url"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(remotes: Vec<ArtifactRepository>) -> RepositoryRegistry {
        RepositoryRegistry::new(LocalRepository::new("/var/cache/mvnr"), remotes)
    }

    #[test]
    fn test_defaults_online_without_mirrors() {
        let registry = registry(vec![ArtifactRepository::central()]);
        assert!(registry.is_online());
        assert!(registry.mirrors().is_empty());
        assert_eq!(registry.remotes().len(), 1);
        assert!(!registry.clone().with_online(false).is_online());
    }

    #[test]
    fn test_duplicate_ids_merged_in_order() {
        let registry = registry(vec![
            ArtifactRepository::new("a", "https://a.example.com"),
            ArtifactRepository::new("b", "https://b.example.com"),
            ArtifactRepository::new("a", "https://a2.example.com"),
        ]);
        let ids: Vec<_> = registry.remotes().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.remote("a").unwrap().url, "https://a.example.com");
    }

    #[test]
    fn test_effective_remotes_apply_mirrors_and_drop_blocked() {
        let mut blocked = Mirror::new("blocked", "https://blocked.example.com", "b");
        blocked.blocked = true;
        let registry = registry(vec![]).with_mirrors(vec![
            Mirror::new("corp", "https://corp.example.com", "a"),
            blocked,
        ]);

        let declared = vec![
            ArtifactRepository::new("a", "https://a.example.com"),
            ArtifactRepository::new("b", "https://b.example.com"),
            ArtifactRepository::new("c", "https://c.example.com"),
        ];
        let effective = registry.effective_remotes(&declared);
        let ids: Vec<_> = effective.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["corp", "c"]);
        assert_eq!(effective[0].mirrored_ids(), vec!["a"]);
    }

    #[test]
    fn test_paths() {
        let registry = registry(vec![]);
        let c = ArtifactCoordinate::new("org.example", "lib", "2.0");
        assert_eq!(
            registry.path_of(&c).unwrap().as_str(),
            "/var/cache/mvnr/org/example/lib/2.0/lib-2.0.jar"
        );
        assert_eq!(
            registry.status_path_of(&c).unwrap().as_str(),
            "/var/cache/mvnr/org/example/lib/2.0/resolver-status.json"
        );
    }

    #[test]
    fn test_validate() {
        assert!(registry(vec![ArtifactRepository::central()]).validate().is_ok());
        assert!(registry(vec![ArtifactRepository::new("", "https://x.example.com")])
            .validate()
            .is_err());
        let empty = RepositoryRegistry::new(LocalRepository::new(""), vec![]);
        assert!(empty.validate().is_err());
    }
}
