//! Artifact coordinates and identity keys.

use crate::error::{MvnrError, MvnrResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::version;

/// Extension used when none is declared
pub const DEFAULT_EXTENSION: &str = "jar";

/// Full identity of one physical artifact file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

/// `groupId:artifactId`, the identity used for dependency management and
/// cycle detection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManagementKey {
    pub group_id: String,
    pub artifact_id: String,
}

/// Management key plus extension and classifier; artifacts that differ
/// only here are mediated independently
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictId {
    pub key: ManagementKey,
    pub extension: String,
    pub classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = if classifier.is_empty() { None } else { Some(classifier) };
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Same artifact at another version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    pub fn key(&self) -> ManagementKey {
        ManagementKey::new(&self.group_id, &self.artifact_id)
    }

    pub fn conflict_id(&self) -> ConflictId {
        ConflictId {
            key: self.key(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        version::is_snapshot(&self.version)
    }

    /// Whether the version is a deployed, timestamped snapshot
    pub fn is_timestamped_snapshot(&self) -> bool {
        version::is_timestamped_snapshot(&self.version)
    }

    /// Coordinate with a timestamped snapshot version replaced by `-SNAPSHOT`
    pub fn base_coordinate(&self) -> Self {
        self.with_version(version::base_version(&self.version))
    }

    /// Reject coordinates that cannot name a file in a repository
    pub fn validate(&self) -> MvnrResult<()> {
        let fields = [
            ("groupId", self.group_id.as_str()),
            ("artifactId", self.artifact_id.as_str()),
            ("version", self.version.as_str()),
            ("extension", self.extension.as_str()),
        ];
        for (name, value) in fields {
            check_segment(self, name, value)?;
        }
        if let Some(classifier) = &self.classifier {
            check_segment(self, "classifier", classifier)?;
        }
        Ok(())
    }
}

fn check_segment(coordinate: &ArtifactCoordinate, name: &str, value: &str) -> MvnrResult<()> {
    if value.trim().is_empty() {
        return Err(MvnrError::malformed(
            coordinate.to_string(),
            format!("{name} must not be empty"),
        ));
    }
    let forbidden = |c: char| matches!(c, '/' | '\\' | ':') || c.is_whitespace();
    if value == "." || value == ".." || value.contains(forbidden) {
        return Err(MvnrError::malformed(
            coordinate.to_string(),
            format!("{name} '{value}' contains characters not allowed in a coordinate"),
        ));
    }
    Ok(())
}

impl fmt::Display for ArtifactCoordinate {
    /// `groupId:artifactId:extension[:classifier]:version`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = MvnrError;

    /// Accepts `g:a:v`, `g:a:ext:v` and `g:a:ext:classifier:v`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let coordinate = match parts.as_slice() {
            [g, a, v] => ArtifactCoordinate::new(*g, *a, *v),
            [g, a, ext, v] => ArtifactCoordinate::new(*g, *a, *v).with_extension(*ext),
            [g, a, ext, classifier, v] => ArtifactCoordinate::new(*g, *a, *v)
                .with_extension(*ext)
                .with_classifier(*classifier),
            _ => {
                return Err(MvnrError::malformed(
                    s,
                    "expected groupId:artifactId[:extension[:classifier]]:version",
                ))
            },
        };
        coordinate.validate()?;
        Ok(coordinate)
    }
}

impl ManagementKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for ManagementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for ManagementKey {
    type Err = MvnrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((g, a)) if !g.is_empty() && !a.is_empty() && !a.contains(':') => {
                Ok(ManagementKey::new(g, a))
            },
            _ => Err(MvnrError::malformed(s, "expected groupId:artifactId")),
        }
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_form() {
        let c: ArtifactCoordinate = "org.example:lib:1.0".parse().unwrap();
        assert_eq!(c.group_id, "org.example");
        assert_eq!(c.artifact_id, "lib");
        assert_eq!(c.version, "1.0");
        assert_eq!(c.extension, "jar");
        assert_eq!(c.classifier, None);
        assert_eq!(c.to_string(), "org.example:lib:jar:1.0");
    }

    #[test]
    fn test_parse_full_form() {
        let c: ArtifactCoordinate = "org.example:lib:zip:sources:2.0".parse().unwrap();
        assert_eq!(c.extension, "zip");
        assert_eq!(c.classifier.as_deref(), Some("sources"));
        assert_eq!(c.to_string(), "org.example:lib:zip:sources:2.0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("org.example:lib".parse::<ArtifactCoordinate>().is_err());
        assert!("org.example::1.0".parse::<ArtifactCoordinate>().is_err());
        assert!("../etc:lib:1.0".parse::<ArtifactCoordinate>().is_err());
        assert!("org example:lib:1.0".parse::<ArtifactCoordinate>().is_err());
    }

    #[test]
    fn test_keys() {
        let jar = ArtifactCoordinate::new("g", "a", "1");
        let sources = jar.clone().with_classifier("sources");
        assert_eq!(jar.key(), sources.key());
        assert_ne!(jar.conflict_id(), sources.conflict_id());
        assert_eq!(jar.key().to_string(), "g:a");
        assert_eq!(sources.conflict_id().to_string(), "g:a:jar:sources");
        assert_eq!("g:a".parse::<ManagementKey>().unwrap(), jar.key());
    }

    #[test]
    fn test_snapshot_helpers() {
        let c = ArtifactCoordinate::new("g", "a", "1.0-20240102.030405-6");
        assert!(c.is_snapshot());
        assert!(c.is_timestamped_snapshot());
        assert_eq!(c.base_coordinate().version, "1.0-SNAPSHOT");
        assert!(!ArtifactCoordinate::new("g", "a", "1.0").is_snapshot());
    }

    #[test]
    fn test_empty_classifier_is_none() {
        let c = ArtifactCoordinate::new("g", "a", "1").with_classifier("");
        assert_eq!(c.classifier, None);
    }
}
