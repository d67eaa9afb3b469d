//! Scope mediation

use std::collections::HashSet;

use mvnr_core::types::{ConflictId, Scope};

/// Result of reconciling the scope an artifact already has with the scope
/// of another path that reaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeUpdate {
    Unchanged(Scope),
    Widened { from: Scope, to: Scope },
}

impl ScopeUpdate {
    pub fn scope(&self) -> Scope {
        match self {
            ScopeUpdate::Unchanged(scope) => *scope,
            ScopeUpdate::Widened { to, .. } => *to,
        }
    }
}

/// Applies the widening table and remembers which artifacts have already
/// been reported as widened.
///
/// One instance per collection; widening is reported once per artifact
/// however many paths reach it.
#[derive(Debug, Default)]
pub struct ScopeMediator {
    reported: HashSet<ConflictId>,
}

impl ScopeMediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective scope of a transitive edge, `None` when it is pruned
    pub fn widen(path: Scope, dependency: Scope) -> Option<Scope> {
        Scope::widen(path, dependency)
    }

    /// Broadest of the current scope and the scope of another path
    pub fn merge(current: Scope, incoming: Scope) -> ScopeUpdate {
        if incoming.widens(current) {
            ScopeUpdate::Widened {
                from: current,
                to: incoming,
            }
        } else {
            ScopeUpdate::Unchanged(current)
        }
    }

    /// Whether a widening of `id` still needs reporting; true only the first
    /// time for each artifact
    pub fn should_report(&mut self, id: &ConflictId) -> bool {
        self.reported.insert(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvnr_core::types::ArtifactCoordinate;

    #[test]
    fn test_merge_prefers_broadest() {
        assert_eq!(
            ScopeMediator::merge(Scope::Test, Scope::Compile),
            ScopeUpdate::Widened {
                from: Scope::Test,
                to: Scope::Compile
            }
        );
        assert_eq!(
            ScopeMediator::merge(Scope::Compile, Scope::Test),
            ScopeUpdate::Unchanged(Scope::Compile)
        );
        assert_eq!(ScopeMediator::merge(Scope::Provided, Scope::Runtime).scope(), Scope::Runtime);
        assert_eq!(ScopeMediator::merge(Scope::System, Scope::Compile).scope(), Scope::System);
    }

    #[test]
    fn test_reported_once_per_artifact() {
        let mut mediator = ScopeMediator::new();
        let util = ArtifactCoordinate::new("org.example", "util", "1.0").conflict_id();
        let other = ArtifactCoordinate::new("org.example", "other", "1.0").conflict_id();
        assert!(mediator.should_report(&util));
        assert!(!mediator.should_report(&util));
        assert!(mediator.should_report(&other));
    }

    #[test]
    fn test_widen_delegates_to_table() {
        assert_eq!(ScopeMediator::widen(Scope::Test, Scope::Compile), Some(Scope::Test));
        assert_eq!(ScopeMediator::widen(Scope::Compile, Scope::Test), None);
    }
}
