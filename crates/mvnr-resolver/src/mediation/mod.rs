//! Conflict mediation between competing declarations of one artifact.
//!
//! - `version`: which of two contenders survives (nearest wins, then the
//!   first declared, unless dependency management decides)
//! - `scope`: the effective scope of a transitive edge and the broadest
//!   scope across every path that reaches an artifact

pub mod scope;
pub mod version;

pub use scope::{ScopeMediator, ScopeUpdate};
pub use version::{Contender, DeclarationPosition, Decision, Mediated, VersionMediator, Winner};
