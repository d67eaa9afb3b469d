//! Unit tests for the update-check store

use super::*;
use chrono::Duration;
use mvnr_repository::{ChecksumPolicy, UpdatePolicy};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn artifact_file(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap()
        .join("g/a/1.0-SNAPSHOT/a-1.0-SNAPSHOT.jar")
}

fn snapshots() -> ArtifactRepository {
    ArtifactRepository::new("snapshots", "https://snapshots.example.com")
}

#[test]
fn test_unchecked_artifact_has_no_record() {
    let dir = TempDir::new().unwrap();
    let index = UpdateCheckIndex::new();
    assert_eq!(index.last_check(&artifact_file(&dir), &snapshots()).unwrap(), None);
}

#[test]
fn test_touch_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    let file = artifact_file(&dir);
    let now = Utc::now();

    UpdateCheckIndex::new().touch(&file, &snapshots(), None, now).unwrap();
    assert!(file.parent().unwrap().join(STATUS_FILE_NAME).is_file());

    let reloaded = UpdateCheckIndex::new();
    let check = reloaded.last_check(&file, &snapshots()).unwrap().unwrap();
    assert_eq!(check.last_checked, now.timestamp_millis());
    assert_eq!(check.error, None);
}

#[test]
fn test_records_are_per_repository() {
    let dir = TempDir::new().unwrap();
    let file = artifact_file(&dir);
    let index = UpdateCheckIndex::new();
    let other = ArtifactRepository::new("other", "https://other.example.com");

    index.touch(&file, &snapshots(), Some("not found"), Utc::now()).unwrap();
    assert_eq!(
        index.cached_error(&file, &snapshots()).unwrap().as_deref(),
        Some("not found")
    );
    assert_eq!(index.last_check(&file, &other).unwrap(), None);
}

#[test]
fn test_policy_evaluated_against_record() {
    let dir = TempDir::new().unwrap();
    let file = artifact_file(&dir);
    let index = UpdateCheckIndex::new();
    let now = Utc::now();
    let hourly = RepositoryPolicy::new(true, UpdatePolicy::Interval(60), ChecksumPolicy::Warn);
    let never = RepositoryPolicy::new(true, UpdatePolicy::Never, ChecksumPolicy::Warn);

    assert!(index.is_update_required(&file, &snapshots(), &never, now).unwrap());

    index.touch(&file, &snapshots(), None, now - Duration::minutes(30)).unwrap();
    assert!(!index.is_update_required(&file, &snapshots(), &hourly, now).unwrap());
    assert!(!index.is_update_required(&file, &snapshots(), &never, now).unwrap());
    assert!(index
        .is_update_required(&file, &snapshots(), &hourly, now + Duration::minutes(45))
        .unwrap());
}

#[test]
fn test_corrupt_record_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let file = artifact_file(&dir);
    let status = file.parent().unwrap().join(STATUS_FILE_NAME);
    fs::create_dir_all(status.parent().unwrap()).unwrap();
    fs::write(&status, "{ not json").unwrap();

    let index = UpdateCheckIndex::new();
    assert_eq!(index.last_check(&file, &snapshots()).unwrap(), None);
    index.touch(&file, &snapshots(), None, Utc::now()).unwrap();
    assert!(index.last_check(&file, &snapshots()).unwrap().is_some());
}

#[test]
fn test_concurrent_touches_keep_every_record() {
    let dir = TempDir::new().unwrap();
    let file = artifact_file(&dir);
    let index = Arc::new(UpdateCheckIndex::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let index = Arc::clone(&index);
            let file = file.clone();
            thread::spawn(move || {
                let repository =
                    ArtifactRepository::new(format!("r{i}"), format!("https://r{i}.example.com"));
                index.touch(&file, &repository, None, Utc::now()).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reloaded = UpdateCheckIndex::new();
    for i in 0..8 {
        let repository =
            ArtifactRepository::new(format!("r{i}"), format!("https://r{i}.example.com"));
        assert!(reloaded.last_check(&file, &repository).unwrap().is_some(), "r{i}");
    }
}
