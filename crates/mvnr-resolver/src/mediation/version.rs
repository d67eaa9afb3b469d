//! Nearest-wins version mediation

use serde::{Deserialize, Serialize};
use std::fmt;

use mvnr_core::types::Dependency;

use crate::managed::ManagedVersionMap;

/// Where a declaration sits in the tree: the index of each dependency in
/// its parent's list, from the root down.
///
/// Ordered lexicographically, so an earlier sibling and everything below it
/// come before a later sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationPosition(Vec<usize>);

impl DeclarationPosition {
    pub fn root() -> Self {
        Self::default()
    }

    /// Position of the `index`-th dependency declared below `self`
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for DeclarationPosition {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for DeclarationPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join("."))
    }
}

/// A declaration competing for a conflict id
#[derive(Debug, Clone)]
pub struct Contender {
    pub dependency: Dependency,
    pub depth: usize,
    pub position: DeclarationPosition,
}

impl Contender {
    pub fn new(dependency: Dependency, position: DeclarationPosition) -> Self {
        Self {
            dependency,
            depth: position.depth(),
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Existing,
    Candidate,
}

/// Why the winner won
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Closer to the root
    Nearer,
    /// Same depth, declared earlier
    FirstDeclared,
    /// Dependency management pinned the version
    Managed,
}

/// Outcome of one mediation
#[derive(Debug, Clone)]
pub struct Mediated {
    /// The surviving declaration, with the managed version applied if any
    pub dependency: Dependency,
    pub winner: Winner,
    pub decision: Decision,
}

impl Mediated {
    pub fn keeps_existing(&self) -> bool {
        self.winner == Winner::Existing
    }
}

/// Picks one declaration per conflict id
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionMediator<'a> {
    managed: Option<&'a ManagedVersionMap>,
}

impl<'a> VersionMediator<'a> {
    pub fn new() -> Self {
        Self { managed: None }
    }

    pub fn with_managed(managed: &'a ManagedVersionMap) -> Self {
        Self {
            managed: Some(managed),
        }
    }

    /// Settle a conflict between the current winner and a new contender.
    ///
    /// A managed version ends mediation: the existing node stays and takes
    /// the managed version. Otherwise the shallower contender wins whatever
    /// the versions, and at equal depth the earlier declaration wins.
    pub fn mediate(&self, existing: &Contender, candidate: &Contender) -> Mediated {
        if let Some(version) = self.managed.and_then(|m| m.version(&existing.dependency.key())) {
            let mut dependency = existing.dependency.clone();
            dependency.coordinate.version = version.to_string();
            return Mediated {
                dependency,
                winner: Winner::Existing,
                decision: Decision::Managed,
            };
        }

        let (winner, decision) = if existing.depth != candidate.depth {
            let winner = if existing.depth < candidate.depth {
                Winner::Existing
            } else {
                Winner::Candidate
            };
            (winner, Decision::Nearer)
        } else if candidate.position < existing.position {
            (Winner::Candidate, Decision::FirstDeclared)
        } else {
            (Winner::Existing, Decision::FirstDeclared)
        };

        let dependency = match winner {
            Winner::Existing => existing.dependency.clone(),
            Winner::Candidate => candidate.dependency.clone(),
        };
        Mediated {
            dependency,
            winner,
            decision,
        }
    }
}
