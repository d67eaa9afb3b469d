//! Global settings (~/.mvnr/settings.toml)

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use mvnr_core::error::MvnrError;
use mvnr_repository::{ArtifactRepository, Mirror};

use crate::document::{invalid, parse_document};
use crate::manifest::{validate_repositories, RepositorySpec};
use crate::ConfigResult;

/// Directory under the home directory holding settings and the default
/// local repository
pub const SETTINGS_DIR: &str = ".mvnr";

pub const SETTINGS_FILE: &str = "settings.toml";

/// User-wide settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,

    /// Parallel downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub mirrors: Vec<MirrorSpec>,

    /// Searched after the project's own repositories
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MirrorSpec {
    pub id: String,
    pub url: String,
    pub mirror_of: String,

    #[serde(default)]
    pub blocked: bool,
}

impl Settings {
    pub fn mirrors(&self) -> Vec<Mirror> {
        self.mirrors
            .iter()
            .map(|m| Mirror {
                blocked: m.blocked,
                ..Mirror::new(&m.id, &m.url, &m.mirror_of)
            })
            .collect()
    }

    pub fn repositories(&self) -> ConfigResult<Vec<ArtifactRepository>> {
        self.repositories.iter().map(RepositorySpec::to_repository).collect()
    }
}

/// Parse a settings document
pub fn parse_settings(content: &str) -> ConfigResult<Settings> {
    parse_settings_named(SETTINGS_FILE, content)
}

fn parse_settings_named(file: &str, content: &str) -> ConfigResult<Settings> {
    let settings: Settings = parse_document(file, content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn validate_settings(settings: &Settings) -> ConfigResult<()> {
    if settings.jobs == Some(0) {
        return Err(invalid("jobs", "must be at least 1"));
    }
    if let Some(path) = &settings.local_repository {
        if path.as_str().trim().is_empty() {
            return Err(invalid("local-repository", "must not be empty"));
        }
    }

    let mut seen = HashSet::new();
    for mirror in &settings.mirrors {
        let field = format!("mirrors.{}", mirror.id);
        if mirror.id.trim().is_empty() {
            return Err(invalid("mirrors.id", "must not be empty"));
        }
        if mirror.mirror_of.trim().is_empty() {
            return Err(invalid(format!("{field}.mirror-of"), "must not be empty"));
        }
        url::Url::parse(&mirror.url).map_err(|e| invalid(format!("{field}.url"), e.to_string()))?;
        if !seen.insert(mirror.id.as_str()) {
            return Err(invalid(field, "mirror ids must be unique"));
        }
    }

    validate_repositories(&settings.repositories)
}

/// Load and validate settings from `path`
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<Settings> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MvnrError::io(format!("Failed to read {path}"), e))?;
    parse_settings_named(path.as_str(), &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings() {
        assert_eq!(parse_settings("").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings(
            r#"
local-repository = "/var/cache/mvnr"
offline = true
jobs = 4

[[mirrors]]
id = "corp"
url = "https://nexus.example.com/maven"
mirror-of = "external:*,!snapshots"

[[repositories]]
id = "snapshots"
url = "https://snapshots.example.com"
snapshots = { update-policy = "always" }
"#,
        )
        .unwrap();

        assert_eq!(settings.local_repository.as_deref(), Some(Utf8Path::new("/var/cache/mvnr")));
        assert_eq!(settings.offline, Some(true));
        assert_eq!(settings.jobs, Some(4));

        let mirrors = settings.mirrors();
        assert_eq!(mirrors[0].mirror_of, "external:*,!snapshots");
        assert!(!mirrors[0].blocked);
        assert_eq!(settings.repositories().unwrap()[0].id, "snapshots");
    }

    #[test]
    fn test_zero_jobs() {
        assert!(matches!(
            parse_settings("jobs = 0").unwrap_err(),
            MvnrError::ConfigValidation { .. }
        ));
    }

    #[test]
    fn test_duplicate_mirror() {
        let err = parse_settings(
            r#"
[[mirrors]]
id = "m"
url = "https://a.example.com"
mirror-of = "*"

[[mirrors]]
id = "m"
url = "https://b.example.com"
mirror-of = "central"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MvnrError::ConfigValidation { .. }));
    }

    #[test]
    fn test_mirror_needs_target() {
        let err = parse_settings(
            r#"
[[mirrors]]
id = "m"
url = "https://a.example.com"
mirror-of = ""
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MvnrError::ConfigValidation { ref field, .. } if field == "mirrors.m.mirror-of"));
    }

    #[tokio::test]
    async fn test_load_reports_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join(SETTINGS_FILE)).unwrap();
        tokio::fs::write(&path, "offline = maybe\n").await.unwrap();

        match load_from_file(&path).await.unwrap_err() {
            MvnrError::TomlParse { file, line, .. } => {
                assert_eq!(file, path.as_str());
                assert_eq!(line, 1);
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
