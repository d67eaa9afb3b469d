//! Version ranges.
//!
//! A declared version is either a soft recommendation (`1.0`), which any
//! version satisfies but which is preferred when nothing else constrains
//! it, or a set of hard restrictions such as `[1.0]`, `[1.0,2.0)` or
//! `(,1.0],[1.2,)`.

use super::version::{Version, VersionError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Range parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Unbounded range: {0}")]
    Unbounded(String),

    #[error("Single version must be surrounded by []: {0}")]
    BareSingleVersion(String),

    #[error("Range cannot have identical boundaries: {0}")]
    IdenticalBounds(String),

    #[error("Range defies version ordering: {0}")]
    Inverted(String),

    #[error("Ranges overlap: {0}")]
    Overlap(String),

    #[error("Only fully-qualified sets allowed in multiple set scenario: {0}")]
    MixedSet(String),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// One interval of a version range; a missing bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Restriction {
    pub lower: Option<Version>,
    pub lower_inclusive: bool,
    pub upper: Option<Version>,
    pub upper_inclusive: bool,
}

impl Restriction {
    /// The restriction every version satisfies
    pub fn everything() -> Self {
        Self {
            lower: None,
            lower_inclusive: false,
            upper: None,
            upper_inclusive: false,
        }
    }

    /// Exactly one version, `[v]`
    pub fn exactly(version: Version) -> Self {
        Self {
            lower: Some(version.clone()),
            lower_inclusive: true,
            upper: Some(version),
            upper_inclusive: true,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match lower.cmp(version) {
                std::cmp::Ordering::Greater => return false,
                std::cmp::Ordering::Equal if !self.lower_inclusive => return false,
                _ => {},
            }
        }
        if let Some(upper) = &self.upper {
            match upper.cmp(version) {
                std::cmp::Ordering::Less => return false,
                std::cmp::Ordering::Equal if !self.upper_inclusive => return false,
                _ => {},
            }
        }
        true
    }

    /// Overlap of two restrictions, if any version can satisfy both
    pub fn intersect(&self, other: &Restriction) -> Option<Restriction> {
        let (lower, lower_inclusive) = match (&self.lower, &other.lower) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.lower_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.lower_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                std::cmp::Ordering::Greater => (Some(a.clone()), self.lower_inclusive),
                std::cmp::Ordering::Less => (Some(b.clone()), other.lower_inclusive),
                std::cmp::Ordering::Equal => (
                    Some(a.clone()),
                    self.lower_inclusive && other.lower_inclusive,
                ),
            },
        };
        let (upper, upper_inclusive) = match (&self.upper, &other.upper) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.upper_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.upper_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                std::cmp::Ordering::Less => (Some(a.clone()), self.upper_inclusive),
                std::cmp::Ordering::Greater => (Some(b.clone()), other.upper_inclusive),
                std::cmp::Ordering::Equal => (
                    Some(a.clone()),
                    self.upper_inclusive && other.upper_inclusive,
                ),
            },
        };

        if let (Some(l), Some(u)) = (&lower, &upper) {
            match l.cmp(u) {
                std::cmp::Ordering::Greater => return None,
                std::cmp::Ordering::Equal if !(lower_inclusive && upper_inclusive) => return None,
                _ => {},
            }
        }

        Some(Restriction {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        })
    }

    fn has_snapshot_bound(&self) -> bool {
        self.lower.as_ref().is_some_and(Version::is_snapshot)
            || self.upper.as_ref().is_some_and(Version::is_snapshot)
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l == u && self.lower_inclusive && self.upper_inclusive {
                return write!(f, "[{l}]");
            }
        }
        f.write_str(if self.lower_inclusive { "[" } else { "(" })?;
        if let Some(l) = &self.lower {
            write!(f, "{l}")?;
        }
        f.write_str(",")?;
        if let Some(u) = &self.upper {
            write!(f, "{u}")?;
        }
        f.write_str(if self.upper_inclusive { "]" } else { ")" })
    }
}

/// A recommended version plus the restrictions a selected version must meet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    recommended: Option<Version>,
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    /// A soft requirement on a single version
    pub fn from_version(version: Version) -> Self {
        Self {
            recommended: Some(version),
            restrictions: vec![Restriction::everything()],
        }
    }

    /// Parse a version specification
    pub fn parse(spec: &str) -> Result<Self, RangeError> {
        let mut process = spec.trim();
        let mut restrictions: Vec<Restriction> = Vec::new();
        let mut upper_bound: Option<Option<Version>> = None;

        while process.starts_with('[') || process.starts_with('(') {
            let close = process
                .find(|c: char| c == ')' || c == ']')
                .ok_or_else(|| RangeError::Unbounded(spec.to_string()))?;
            let restriction = parse_restriction(&process[..=close])?;

            if let Some(previous_upper) = &upper_bound {
                let overlaps = match (previous_upper, &restriction.lower) {
                    (None, _) | (_, None) => true,
                    (Some(upper), Some(lower)) => lower < upper,
                };
                if overlaps {
                    return Err(RangeError::Overlap(spec.to_string()));
                }
            }
            upper_bound = Some(restriction.upper.clone());
            restrictions.push(restriction);

            process = process[close + 1..].trim();
            if let Some(rest) = process.strip_prefix(',') {
                process = rest.trim();
            }
        }

        if !process.is_empty() {
            if !restrictions.is_empty() {
                return Err(RangeError::MixedSet(spec.to_string()));
            }
            return Ok(Self::from_version(process.parse()?));
        }

        Ok(Self {
            recommended: None,
            restrictions,
        })
    }

    pub fn recommended(&self) -> Option<&Version> {
        self.recommended.as_ref()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    /// Whether a hard restriction must be satisfied from available versions
    pub fn has_restrictions(&self) -> bool {
        !self.restrictions.is_empty() && self.recommended.is_none()
    }

    /// No version can ever satisfy this range
    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// Intersect with another range, keeping whichever recommendation still fits
    pub fn restrict(&self, other: &VersionRange) -> VersionRange {
        let mut restrictions = Vec::new();
        for a in &self.restrictions {
            for b in &other.restrictions {
                if let Some(r) = a.intersect(b) {
                    restrictions.push(r);
                }
            }
        }

        let recommended = if restrictions.is_empty() {
            None
        } else {
            let fits = |v: &&Version| restrictions.iter().any(|r| r.contains(v));
            self.recommended
                .as_ref()
                .filter(fits)
                .or_else(|| other.recommended.as_ref().filter(fits))
                .cloned()
        };

        VersionRange {
            recommended,
            restrictions,
        }
    }

    /// Highest available version inside the range.
    ///
    /// Snapshots only match when one of the bounds is itself a snapshot.
    pub fn match_version<'a>(&self, available: &'a [Version]) -> Option<&'a Version> {
        let allow_snapshots = self.restrictions.iter().any(Restriction::has_snapshot_bound);
        available
            .iter()
            .filter(|v| allow_snapshots || !v.is_snapshot())
            .filter(|v| self.contains(v))
            .max()
    }
}

fn parse_restriction(spec: &str) -> Result<Restriction, RangeError> {
    let lower_inclusive = spec.starts_with('[');
    let upper_inclusive = spec.ends_with(']');
    let inner = spec[1..spec.len() - 1].trim();

    match inner.split_once(',') {
        None => {
            if !lower_inclusive || !upper_inclusive {
                return Err(RangeError::BareSingleVersion(spec.to_string()));
            }
            Ok(Restriction::exactly(inner.parse()?))
        },
        Some((lower, upper)) => {
            let (lower, upper) = (lower.trim(), upper.trim());
            if lower == upper {
                return Err(RangeError::IdenticalBounds(spec.to_string()));
            }
            let lower: Option<Version> = if lower.is_empty() { None } else { Some(lower.parse()?) };
            let upper: Option<Version> = if upper.is_empty() { None } else { Some(upper.parse()?) };
            if let (Some(l), Some(u)) = (&lower, &upper) {
                if u < l {
                    return Err(RangeError::Inverted(spec.to_string()));
                }
            }
            Ok(Restriction {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            })
        },
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(recommended) = &self.recommended {
            return write!(f, "{recommended}");
        }
        for (i, r) in self.restrictions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}
