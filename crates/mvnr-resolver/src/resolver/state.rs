//! Lifecycle of one artifact resolution

use serde::Serialize;
use std::fmt;
use tracing::trace;

use mvnr_core::error::MvnrError;

use crate::ResolverResult;

/// Where one resolve invocation stands.
///
/// `Unresolved` moves straight to `Resolved` on a usable local file, or to
/// `NotFound` when a fetch is needed but not allowed; otherwise it moves
/// through `Fetching`. The last three states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionState {
    #[default]
    Unresolved,
    Fetching,
    Resolved,
    NotFound,
    Failed,
}

impl ResolutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResolutionState::Resolved | ResolutionState::NotFound | ResolutionState::Failed
        )
    }

    pub fn can_advance_to(self, next: ResolutionState) -> bool {
        use ResolutionState::*;

        matches!(
            (self, next),
            (Unresolved, Resolved)
                | (Unresolved, NotFound)
                | (Unresolved, Fetching)
                | (Fetching, Resolved)
                | (Fetching, NotFound)
                | (Fetching, Failed)
        )
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow
    pub fn advance(&mut self, next: ResolutionState) -> ResolverResult<()> {
        if !self.can_advance_to(next) {
            return Err(MvnrError::malformed(
                "resolution state",
                format!("cannot move from {self} to {next}"),
            ));
        }
        trace!("{} -> {}", self, next);
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionState::Unresolved => "unresolved",
            ResolutionState::Fetching => "fetching",
            ResolutionState::Resolved => "resolved",
            ResolutionState::NotFound => "not-found",
            ResolutionState::Failed => "failed",
        })
    }
}
