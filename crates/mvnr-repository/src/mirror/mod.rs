//! Mirror selection.
//!
//! A mirror stands in for one or more repositories. `mirror_of` accepts:
//! - `*` for every repository
//! - `external:*` for everything not on the local host and not file based
//! - `external:http:*` for plain-HTTP repositories not on the local host
//! - `a,b` for either listed id, with `!id` excluding one

use serde::{Deserialize, Serialize};

use crate::repository::{effective_repositories, ArtifactRepository, DEFAULT_LAYOUT};

const WILDCARD: &str = "*";
const EXTERNAL_WILDCARD: &str = "external:*";
const EXTERNAL_HTTP_WILDCARD: &str = "external:http:*";

/// A repository that replaces others matched by `mirror_of`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    pub id: String,
    pub url: String,
    pub mirror_of: String,
    /// Layouts this mirror serves; `None` serves every layout
    pub mirror_of_layouts: Option<String>,
    pub layout: String,
    pub blocked: bool,
}

impl Mirror {
    pub fn new(id: impl Into<String>, url: impl Into<String>, mirror_of: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            mirror_of: mirror_of.into(),
            mirror_of_layouts: None,
            layout: DEFAULT_LAYOUT.to_string(),
            blocked: false,
        }
    }
}

/// Mirror to use for `repository`; an exact id match beats any pattern
pub fn select_mirror<'a>(repository: &ArtifactRepository, mirrors: &'a [Mirror]) -> Option<&'a Mirror> {
    mirrors
        .iter()
        .find(|m| m.mirror_of == repository.id && matches_layout(&repository.layout, m))
        .or_else(|| {
            mirrors.iter().find(|m| {
                match_pattern(repository, &m.mirror_of) && matches_layout(&repository.layout, m)
            })
        })
}

/// Whether `pattern` selects `repository`
pub fn match_pattern(repository: &ArtifactRepository, pattern: &str) -> bool {
    if pattern == WILDCARD || pattern == repository.id {
        return true;
    }

    let mut result = false;
    for entry in pattern.split(',').map(str::trim) {
        if let Some(excluded) = entry.strip_prefix('!').filter(|id| !id.is_empty()) {
            if excluded == repository.id {
                return false;
            }
        } else if entry == repository.id {
            return true;
        } else if (entry == EXTERNAL_WILDCARD && repository.is_external())
            || (entry == EXTERNAL_HTTP_WILDCARD && repository.is_external_http())
            || entry == WILDCARD
        {
            // A later !id may still exclude this repository
            result = true;
        }
    }
    result
}

fn matches_layout(repository_layout: &str, mirror: &Mirror) -> bool {
    let Some(layouts) = mirror.mirror_of_layouts.as_deref().filter(|l| !l.is_empty()) else {
        return true;
    };
    if layouts == WILDCARD || layouts == repository_layout {
        return true;
    }

    let mut result = false;
    for entry in layouts.split(',').map(str::trim) {
        if let Some(excluded) = entry.strip_prefix('!').filter(|l| !l.is_empty()) {
            if excluded == repository_layout {
                return false;
            }
        } else if entry == repository_layout {
            return true;
        } else if entry == WILDCARD {
            result = true;
        }
    }
    result
}

/// Replace every repository that has a mirror with the mirror, then merge
/// repositories that now share an id.
///
/// The replacement keeps the original's policies and records the original
/// in `mirrored`.
pub fn apply_mirrors(repositories: &[ArtifactRepository], mirrors: &[Mirror]) -> Vec<ArtifactRepository> {
    if mirrors.is_empty() {
        return repositories.to_vec();
    }

    let replaced: Vec<ArtifactRepository> = repositories
        .iter()
        .map(|repository| match select_mirror(repository, mirrors) {
            Some(mirror) => {
                let mut original = repository.clone();
                original.mirrored.clear();
                ArtifactRepository {
                    id: mirror.id.clone(),
                    url: mirror.url.trim_end_matches('/').to_string(),
                    layout: mirror.layout.clone(),
                    blocked: mirror.blocked,
                    authentication: None,
                    proxy: repository.proxy.clone(),
                    mirrored: vec![original],
                    ..repository.clone()
                }
            },
            None => repository.clone(),
        })
        .collect();

    effective_repositories(&replaced)
}

#[cfg(test)]
mod tests;
