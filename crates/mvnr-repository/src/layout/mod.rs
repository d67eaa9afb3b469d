//! Default repository layout.
//!
//! `org.example:lib:jar:sources:1.0` lives at
//! `org/example/lib/1.0/lib-1.0-sources.jar`. Timestamped snapshots sit in
//! the directory of their base version.

use camino::Utf8PathBuf;

use mvnr_core::types::{version, ArtifactCoordinate};

/// Extension of the published SHA-1 checksum
pub const CHECKSUM_EXTENSION: &str = "sha1";

/// Directory of `coordinate`, relative to the repository root
pub fn directory_of(coordinate: &ArtifactCoordinate) -> Utf8PathBuf {
    let mut dir = Utf8PathBuf::new();
    for segment in coordinate.group_id.split('.') {
        dir.push(segment);
    }
    dir.push(&coordinate.artifact_id);
    dir.push(version::base_version(&coordinate.version));
    dir
}

/// File name of `coordinate`
pub fn file_name_of(coordinate: &ArtifactCoordinate) -> String {
    let mut name = format!("{}-{}", coordinate.artifact_id, coordinate.version);
    if let Some(classifier) = &coordinate.classifier {
        name.push('-');
        name.push_str(classifier);
    }
    name.push('.');
    name.push_str(&coordinate.extension);
    name
}

/// Path of `coordinate`, relative to the repository root
pub fn path_of(coordinate: &ArtifactCoordinate) -> Utf8PathBuf {
    directory_of(coordinate).join(file_name_of(coordinate))
}

/// Path of the checksum published next to `coordinate`
pub fn checksum_path_of(coordinate: &ArtifactCoordinate) -> Utf8PathBuf {
    let mut path = path_of(coordinate).into_string();
    path.push('.');
    path.push_str(CHECKSUM_EXTENSION);
    Utf8PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_path() {
        let c = ArtifactCoordinate::new("org.apache.commons", "commons-lang3", "3.14.0");
        assert_eq!(
            path_of(&c).as_str(),
            "org/apache/commons/commons-lang3/3.14.0/commons-lang3-3.14.0.jar"
        );
    }

    #[test]
    fn test_classifier_and_extension() {
        let c = ArtifactCoordinate::new("g", "a", "1.0")
            .with_extension("zip")
            .with_classifier("dist");
        assert_eq!(file_name_of(&c), "a-1.0-dist.zip");
        assert_eq!(checksum_path_of(&c).as_str(), "g/a/1.0/a-1.0-dist.zip.sha1");
    }

    #[test]
    fn test_timestamped_snapshot_uses_base_directory() {
        let c = ArtifactCoordinate::new("g", "a", "1.0-20240102.030405-6");
        assert_eq!(directory_of(&c).as_str(), "g/a/1.0-SNAPSHOT");
        assert_eq!(file_name_of(&c), "a-1.0-20240102.030405-6.jar");

        let base = c.base_coordinate();
        assert_eq!(path_of(&base).as_str(), "g/a/1.0-SNAPSHOT/a-1.0-SNAPSHOT.jar");
    }
}
