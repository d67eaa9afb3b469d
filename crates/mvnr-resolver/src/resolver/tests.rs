use super::*;
use mvnr_cache::LocalRepository;
use mvnr_core::utils::sha1_hex;
use mvnr_repository::{checksum_path_of, path_of, FileTransport, Mirror, TransportError, UpdatePolicy};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// File transport that counts every fetch it is asked to make
#[derive(Default)]
struct CountingTransport {
    inner: FileTransport,
    calls: AtomicUsize,
}

impl Transport for CountingTransport {
    fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
        destination: &Utf8Path,
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(coordinate, repository, destination)
    }

    fn fetch_checksum(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &ArtifactRepository,
    ) -> Result<Option<String>, TransportError> {
        self.inner.fetch_checksum(coordinate, repository)
    }
}

struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
    transport: Arc<CountingTransport>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        Self {
            _dir: dir,
            root,
            transport: Arc::new(CountingTransport::default()),
        }
    }

    fn remote(&self, id: &str) -> ArtifactRepository {
        let dir = self.root.join(id);
        fs::create_dir_all(&dir).unwrap();
        let url = url::Url::from_directory_path(dir.as_std_path()).unwrap();
        ArtifactRepository::new(id, url.as_str())
    }

    fn publish(&self, id: &str, coordinate: &ArtifactCoordinate, contents: &str) {
        let path = self.root.join(id).join(path_of(coordinate));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn publish_checksum(&self, id: &str, coordinate: &ArtifactCoordinate, checksum: &str) {
        let path = self.root.join(id).join(checksum_path_of(coordinate));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("{checksum}  artifact.jar\n")).unwrap();
    }

    fn registry(&self, remotes: Vec<ArtifactRepository>) -> RepositoryRegistry {
        RepositoryRegistry::new(LocalRepository::new(self.root.join("local")), remotes)
    }

    fn resolver(&self, registry: RepositoryRegistry) -> ArtifactResolver {
        ArtifactResolver::new(registry, self.transport.clone())
    }

    fn install_locally(&self, registry: &RepositoryRegistry, coordinate: &ArtifactCoordinate, contents: &str) {
        let path = registry.path_of(coordinate).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn calls(&self) -> usize {
        self.transport.calls.load(Ordering::SeqCst)
    }
}

fn lib(version: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::new("org.example", "lib", version)
}

fn read(artifact: &ResolvedArtifact) -> String {
    fs::read_to_string(artifact.file().unwrap()).unwrap()
}

#[test]
fn test_downloads_missing_artifact() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "release");
    let registry = fx.registry(vec![fx.remote("remote")]);
    let resolver = fx.resolver(registry.clone());

    let artifact = resolver.resolve(&ArtifactRequest::new(lib("1.0"))).unwrap();
    assert_eq!(artifact.state, ResolutionState::Resolved);
    assert_eq!(artifact.repository.as_deref(), Some("remote"));
    assert_eq!(artifact.file.as_deref(), Some(registry.path_of(&lib("1.0")).unwrap().as_path()));
    assert_eq!(read(&artifact), "release");
    assert!(artifact.is_resolved());
    assert_eq!(fx.calls(), 1);

    // No scratch files are left behind
    let dir = registry.local().directory_of(&lib("1.0")).unwrap();
    let leftovers = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_local_hit_makes_no_remote_calls() {
    let fx = Fixture::new();
    let registry = fx.registry(vec![fx.remote("remote")]);
    fx.install_locally(&registry, &lib("1.0"), "cached");

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap();
    assert_eq!(read(&artifact), "cached");
    assert_eq!(artifact.repository, None);
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_offline_miss_is_not_found_without_transport() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "release");
    let registry = fx.registry(vec![fx.remote("remote")]).with_online(false);

    let err = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(matches!(err, MvnrError::NotFound { .. }));
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_never_updated_snapshot_makes_no_remote_calls() {
    let fx = Fixture::new();
    let snapshot = lib("1.0-SNAPSHOT");
    fx.publish("remote", &snapshot, "newer");
    let remote = fx
        .remote("remote")
        .with_snapshots(RepositoryPolicy::new(true, UpdatePolicy::Never, ChecksumPolicy::Warn));
    let registry = fx.registry(vec![remote]);
    fx.install_locally(&registry, &snapshot, "local");

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(snapshot)).unwrap();
    assert_eq!(read(&artifact), "local");
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_always_updated_snapshot_is_refreshed() {
    let fx = Fixture::new();
    let snapshot = lib("1.0-SNAPSHOT");
    fx.publish("remote", &snapshot, "newer");
    let remote = fx
        .remote("remote")
        .with_snapshots(RepositoryPolicy::new(true, UpdatePolicy::Always, ChecksumPolicy::Warn));
    let registry = fx.registry(vec![remote]);
    fx.install_locally(&registry, &snapshot, "local");

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(snapshot)).unwrap();
    assert_eq!(read(&artifact), "newer");
    assert_eq!(artifact.repository.as_deref(), Some("remote"));
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_snapshot_update_keeps_local_copy_when_absent_remotely() {
    let fx = Fixture::new();
    let snapshot = lib("1.0-SNAPSHOT");
    let remote = fx
        .remote("remote")
        .with_snapshots(RepositoryPolicy::new(true, UpdatePolicy::Always, ChecksumPolicy::Warn));
    let registry = fx.registry(vec![remote]);
    fx.install_locally(&registry, &snapshot, "local");

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(snapshot)).unwrap();
    assert_eq!(read(&artifact), "local");
    assert_eq!(artifact.repository, None);
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_snapshot_update_transfer_failure_is_reported() {
    let fx = Fixture::new();
    let snapshot = lib("1.0-SNAPSHOT");
    let remote = ArtifactRepository::new("web", "https://repo.example.invalid/maven2")
        .with_snapshots(RepositoryPolicy::new(true, UpdatePolicy::Always, ChecksumPolicy::Warn));
    let registry = fx.registry(vec![remote]);
    fx.install_locally(&registry, &snapshot, "local");

    let err = fx
        .resolver(registry.clone())
        .resolve(&ArtifactRequest::new(snapshot.clone()))
        .unwrap_err();
    assert!(matches!(err, MvnrError::ResolutionFailure { .. }));
    assert_eq!(fx.calls(), 1);
    let local = registry.path_of(&snapshot).unwrap();
    assert_eq!(fs::read_to_string(local).unwrap(), "local");
}

#[test]
fn test_offline_snapshot_update_uses_local_copy() {
    let fx = Fixture::new();
    let snapshot = lib("1.0-SNAPSHOT");
    let remote = fx
        .remote("remote")
        .with_snapshots(RepositoryPolicy::new(true, UpdatePolicy::Always, ChecksumPolicy::Warn));
    let registry = fx.registry(vec![remote]).with_online(false);
    fx.install_locally(&registry, &snapshot, "local");

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(snapshot)).unwrap();
    assert_eq!(read(&artifact), "local");
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_not_found_everywhere() {
    let fx = Fixture::new();
    let registry = fx.registry(vec![fx.remote("first"), fx.remote("second")]);
    let resolver = fx.resolver(registry);

    let err = resolver.resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("first, second"));
    assert_eq!(fx.calls(), 2);

    // Both misses are remembered until the daily policy comes due again
    let err = resolver.resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.calls(), 2);
}

#[test]
fn test_repositories_tried_in_registry_order() {
    let fx = Fixture::new();
    fx.publish("second", &lib("1.0"), "from second");
    fx.publish("third", &lib("1.0"), "from third");
    let registry = fx.registry(vec![fx.remote("first"), fx.remote("second"), fx.remote("third")]);

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap();
    assert_eq!(artifact.repository.as_deref(), Some("second"));
    assert_eq!(read(&artifact), "from second");
    assert_eq!(fx.calls(), 2);
}

#[test]
fn test_pinned_repository_is_the_only_one_tried() {
    let fx = Fixture::new();
    fx.publish("first", &lib("1.0"), "from first");
    fx.publish("second", &lib("1.0"), "from second");
    let registry = fx.registry(vec![fx.remote("first"), fx.remote("second")]);

    let request = ArtifactRequest::new(lib("1.0")).pinned_to("second");
    let artifact = fx.resolver(registry).resolve(&request).unwrap();
    assert_eq!(read(&artifact), "from second");
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_request_repositories_override_registry() {
    let fx = Fixture::new();
    fx.publish("extra", &lib("1.0"), "from extra");
    let registry = fx.registry(vec![fx.remote("first")]);

    let request = ArtifactRequest::new(lib("1.0")).with_repositories(vec![fx.remote("extra")]);
    let artifact = fx.resolver(registry).resolve(&request).unwrap();
    assert_eq!(artifact.repository.as_deref(), Some("extra"));
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_transfer_failure_is_not_not_found() {
    let fx = Fixture::new();
    let registry = fx.registry(vec![ArtifactRepository::new("web", "https://repo.example.invalid/maven2")]);

    let err = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(matches!(err, MvnrError::ResolutionFailure { .. }));
    assert!(!err.is_not_found());
}

#[test]
fn test_checksum_mismatch_fails_under_fail_policy() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "tampered");
    fx.publish_checksum("remote", &lib("1.0"), &sha1_hex(b"original"));
    let remote = fx
        .remote("remote")
        .with_releases(RepositoryPolicy::new(true, UpdatePolicy::Daily, ChecksumPolicy::Fail));
    let registry = fx.registry(vec![remote]);

    let err = fx.resolver(registry.clone()).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(matches!(err, MvnrError::ChecksumMismatch { .. }));
    assert!(!registry.path_of(&lib("1.0")).unwrap().exists());
}

#[test]
fn test_checksum_mismatch_only_warns_under_warn_policy() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "tampered");
    fx.publish_checksum("remote", &lib("1.0"), &sha1_hex(b"original"));
    let registry = fx.registry(vec![fx.remote("remote")]);

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap();
    assert_eq!(read(&artifact), "tampered");
}

#[test]
fn test_matching_checksum_passes() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "original");
    fx.publish_checksum("remote", &lib("1.0"), &sha1_hex(b"original"));
    let remote = fx
        .remote("remote")
        .with_releases(RepositoryPolicy::new(true, UpdatePolicy::Daily, ChecksumPolicy::Fail));
    let registry = fx.registry(vec![remote]);

    assert!(fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).is_ok());
}

#[test]
fn test_system_scope_never_touches_repositories() {
    let fx = Fixture::new();
    let registry = fx.registry(vec![fx.remote("remote")]);
    let resolver = fx.resolver(registry);
    let tools = fx.root.join("tools.jar");
    fs::write(&tools, "tools").unwrap();

    let artifact = resolver
        .resolve(&ArtifactRequest::new(lib("1.0")).with_system_path(tools.clone()))
        .unwrap();
    assert_eq!(artifact.file, Some(tools));
    assert_eq!(artifact.scope, Scope::System);

    let err = resolver
        .resolve(&ArtifactRequest::new(lib("1.0")).with_system_path(fx.root.join("missing.jar")))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_timestamped_snapshot_copied_to_base_version() {
    let fx = Fixture::new();
    let deployed = lib("1.0-20240101.120000-3");
    fx.publish("remote", &deployed, "build 3");
    let registry = fx.registry(vec![fx.remote("remote")]);

    let artifact = fx.resolver(registry.clone()).resolve(&ArtifactRequest::new(deployed)).unwrap();
    assert_eq!(read(&artifact), "build 3");

    let base = registry.path_of(&lib("1.0-SNAPSHOT")).unwrap();
    assert_eq!(fs::read_to_string(base).unwrap(), "build 3");
}

#[test]
fn test_force_refetches() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "remote");
    let registry = fx.registry(vec![fx.remote("remote")]);
    fx.install_locally(&registry, &lib("1.0"), "stale");

    let artifact = fx
        .resolver(registry)
        .resolve(&ArtifactRequest::new(lib("1.0")).forced(true))
        .unwrap();
    assert_eq!(read(&artifact), "remote");
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_mirror_serves_requests() {
    let fx = Fixture::new();
    fx.publish("mirror", &lib("1.0"), "mirrored");
    let mirror_url = fx.remote("mirror").url;
    let registry = fx
        .registry(vec![ArtifactRepository::new("origin", "https://origin.example.invalid/maven2")])
        .with_mirrors(vec![Mirror::new("mirror", mirror_url, "*")]);

    let artifact = fx.resolver(registry).resolve(&ArtifactRequest::new(lib("1.0"))).unwrap();
    assert_eq!(artifact.repository.as_deref(), Some("mirror"));
    assert_eq!(read(&artifact), "mirrored");
}

#[test]
fn test_cancelled_before_fetch() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "release");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let resolver = fx.resolver(fx.registry(vec![fx.remote("remote")])).with_cancellation(cancel);

    let err = resolver.resolve(&ArtifactRequest::new(lib("1.0"))).unwrap_err();
    assert!(matches!(err, MvnrError::Cancelled));
    assert_eq!(fx.calls(), 0);
}

#[test]
fn test_concurrent_resolvers_fetch_once() {
    let fx = Fixture::new();
    fx.publish("remote", &lib("1.0"), "release");
    let resolver = fx.resolver(fx.registry(vec![fx.remote("remote")]));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolver.resolve(&ArtifactRequest::new(lib("1.0")))))
            .collect();
        for handle in handles {
            let artifact = handle.join().unwrap().unwrap();
            assert_eq!(read(&artifact), "release");
        }
    });
    assert_eq!(fx.calls(), 1);
}

#[test]
fn test_invalid_coordinate_is_malformed() {
    let fx = Fixture::new();
    let resolver = fx.resolver(fx.registry(vec![fx.remote("remote")]));
    let err = resolver
        .resolve(&ArtifactRequest::new(ArtifactCoordinate::new("org.example", "../escape", "1.0")))
        .unwrap_err();
    assert!(matches!(err, MvnrError::MalformedInput { .. }));
}
