//! Dependency resolution engine for mvnr
//!
//! Collection walks the declared dependencies of a root artifact and
//! produces an immutable tree with one included node per conflict id:
//! nearest wins, then first declared, with dependency management pinning
//! versions and scopes. Resolution then locates each included artifact's
//! file in the local repository or fetches it from the remotes.

pub mod cancel;
pub mod capability;
pub mod collector;
pub mod filter;
pub mod graph;
pub mod listener;
pub mod managed;
pub mod mediation;
pub mod metadata;
pub mod resolver;
pub mod transitive;

// Re-export main types
pub use cancel::CancellationToken;
pub use capability::{Resolvable, Versioned};
pub use collector::{CollectRequest, CollectResult, DependencyCollector, NodeError};
pub use filter::{AndFilter, ArtifactFilter, ExclusionSetFilter, ExtensionFilter, ScopeFilter};
pub use graph::{DependencyGraph, DependencyTree, GraphNode, NodeId, NodeStatus};
pub use listener::{
    DebugResolutionListener, ListenerSet, ResolutionEvent, ResolutionListener,
    WarningResolutionListener,
};
pub use managed::ManagedVersionMap;
pub use mediation::{DeclarationPosition, ScopeMediator, VersionMediator};
pub use metadata::{InMemoryMetadataSource, MetadataSource, ResolutionGroup};
pub use resolver::{ArtifactRequest, ArtifactResolver, ResolutionState, ResolvedArtifact};
pub use transitive::{ArtifactResolutionResult, TransitiveResolver};

use mvnr_core::error::MvnrError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, MvnrError>;
