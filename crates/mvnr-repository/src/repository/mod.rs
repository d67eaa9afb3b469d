//! Remote repository descriptors.

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use mvnr_core::types::ArtifactCoordinate;
use mvnr_core::utils::sha1_hex;

use crate::policy::{ChecksumPolicy, RepositoryPolicy, UpdatePolicy};

/// Identifier of the default remote repository
pub const CENTRAL_ID: &str = "central";

/// URL of the default remote repository
pub const CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Layout name understood by `path_of`
pub const DEFAULT_LAYOUT: &str = "default";

/// Credentials for a repository or proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authentication {
    pub username: String,
    pub password: Option<String>,
}

/// Proxy a repository is reached through
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub non_proxy_hosts: Option<String>,
    pub authentication: Option<Authentication>,
}

/// A remote repository and the policies that govern fetching from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRepository {
    pub id: String,
    pub url: String,
    pub layout: String,
    pub releases: RepositoryPolicy,
    pub snapshots: RepositoryPolicy,
    pub authentication: Option<Authentication>,
    pub proxy: Option<Proxy>,
    /// Repositories this one stands in for when it is a mirror
    pub mirrored: Vec<ArtifactRepository>,
    /// A blocked repository is never contacted
    pub blocked: bool,
}

impl ArtifactRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into().trim_end_matches('/').to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            releases: RepositoryPolicy::default(),
            snapshots: RepositoryPolicy::default(),
            authentication: None,
            proxy: None,
            mirrored: Vec::new(),
            blocked: false,
        }
    }

    /// The default remote repository: daily updates, warn on bad checksums,
    /// snapshots disabled
    pub fn central() -> Self {
        Self::new(CENTRAL_ID, CENTRAL_URL)
            .with_releases(RepositoryPolicy::new(true, UpdatePolicy::Daily, ChecksumPolicy::Warn))
            .with_snapshots(RepositoryPolicy::disabled())
    }

    pub fn with_releases(mut self, policy: RepositoryPolicy) -> Self {
        self.releases = policy;
        self
    }

    pub fn with_snapshots(mut self, policy: RepositoryPolicy) -> Self {
        self.snapshots = policy;
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Policy that applies to `coordinate`
    pub fn policy_for(&self, coordinate: &ArtifactCoordinate) -> &RepositoryPolicy {
        if coordinate.is_snapshot() {
            &self.snapshots
        } else {
            &self.releases
        }
    }

    /// Filesystem root of a `file://` repository
    pub fn base_dir(&self) -> Option<Utf8PathBuf> {
        let url = Url::parse(&self.url).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        let path = url.to_file_path().ok()?;
        Utf8PathBuf::from_path_buf(path).ok()
    }

    pub fn is_file(&self) -> bool {
        Url::parse(&self.url).is_ok_and(|url| url.scheme() == "file")
    }

    /// Neither on the local host nor file based
    pub fn is_external(&self) -> bool {
        match Url::parse(&self.url) {
            Ok(url) => url.scheme() != "file" && !is_local_host(url.host_str()),
            Err(_) => false,
        }
    }

    /// Reached with plain HTTP and not on the local host
    pub fn is_external_http(&self) -> bool {
        match Url::parse(&self.url) {
            Ok(url) => {
                matches!(url.scheme(), "http" | "dav" | "dav:http" | "dav+http")
                    && !is_local_host(url.host_str())
            },
            Err(_) => false,
        }
    }

    /// Key under which update checks against this repository are recorded.
    ///
    /// Credentials and proxies change what a repository can serve, so a
    /// digest of them is part of the key.
    pub fn repository_key(&self) -> String {
        let mut key = String::new();
        if let Some(proxy) = &self.proxy {
            if let Some(auth) = &proxy.authentication {
                key.push_str(&credential_digest(auth));
                key.push('@');
            }
            key.push_str(&format!("{}:{}>", proxy.host, proxy.port));
        }
        if let Some(auth) = &self.authentication {
            key.push_str(&credential_digest(auth));
            key.push('@');
        }
        key.push_str(&self.url);
        key
    }

    /// Ids of the repositories a mirror replaces, or the id itself
    pub fn mirrored_ids(&self) -> Vec<&str> {
        if self.mirrored.is_empty() {
            vec![self.id.as_str()]
        } else {
            self.mirrored.iter().map(|r| r.id.as_str()).collect()
        }
    }
}

fn credential_digest(auth: &Authentication) -> String {
    let material = format!("{}{}", auth.username, auth.password.as_deref().unwrap_or_default());
    sha1_hex(material.as_bytes())[..8].to_string()
}

fn is_local_host(host: Option<&str>) -> bool {
    matches!(host, Some("localhost") | Some("127.0.0.1"))
}

impl fmt::Display for ArtifactRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Merge repositories declared more than once under the same id.
///
/// The first declaration supplies url, layout and credentials; release and
/// snapshot policies are merged across all declarations. Order of first
/// appearance is kept.
pub fn effective_repositories(repositories: &[ArtifactRepository]) -> Vec<ArtifactRepository> {
    let mut by_id: IndexMap<&str, Vec<&ArtifactRepository>> = IndexMap::new();
    for repository in repositories {
        by_id.entry(repository.id.as_str()).or_default().push(repository);
    }

    by_id
        .into_values()
        .map(|aliases| {
            let mut effective = aliases[0].clone();
            for alias in &aliases[1..] {
                effective.releases.merge(&alias.releases);
                effective.snapshots.merge(&alias.snapshots);
                for mirrored in &alias.mirrored {
                    if !effective.mirrored.iter().any(|m| m.id == mirrored.id) {
                        effective.mirrored.push(mirrored.clone());
                    }
                }
            }
            effective
        })
        .collect()
}
