//! Diagnostic callbacks fired while the tree is collected

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use mvnr_core::types::{ArtifactCoordinate, ManagementKey, Scope};

/// Everything the collector reports about its decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionEvent {
    TestArtifact { node: ArtifactCoordinate },
    StartProcessChildren { node: ArtifactCoordinate },
    EndProcessChildren { node: ArtifactCoordinate },
    IncludeArtifact { node: ArtifactCoordinate, scope: Scope },
    OmitForNearer { omitted: ArtifactCoordinate, kept: ArtifactCoordinate },
    OmitForCycle { node: ArtifactCoordinate },
    /// The artifact was reached through a broader path and its scope widened
    UpdateScope { node: ArtifactCoordinate, from: Scope, to: Scope },
    /// A broader path was ignored because the project declares the
    /// dependency directly
    UpdateScopeCurrentPom { node: ArtifactCoordinate, kept: Scope, ignored: Scope },
    ManageVersion { node: ArtifactCoordinate, from: String, to: String },
    ManageScope { node: ArtifactCoordinate, from: Scope, to: Scope },
    ManageSystemPath { node: ArtifactCoordinate, path: Utf8PathBuf },
    SelectVersionFromRange { node: ArtifactCoordinate, range: String, selected: String },
    RestrictRange { node: ArtifactCoordinate, range: String, restricted: String },
    VersionConflict {
        key: ManagementKey,
        kept: String,
        rejected: String,
        required_by: String,
    },
    Filtered { node: ArtifactCoordinate, scope: Scope },
}

impl fmt::Display for ResolutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ResolutionEvent::*;

        match self {
            TestArtifact { node } => write!(f, "testing {node}"),
            StartProcessChildren { node } => write!(f, "processing children of {node}"),
            EndProcessChildren { node } => write!(f, "done with children of {node}"),
            IncludeArtifact { node, scope } => write!(f, "including {node} ({scope})"),
            OmitForNearer { omitted, kept } => {
                write!(f, "omitting {omitted} in favour of nearer {kept}")
            },
            OmitForCycle { node } => write!(f, "omitting {node} for cycle"),
            UpdateScope { node, from, to } => write!(f, "widening {node} from {from} to {to}"),
            UpdateScopeCurrentPom { node, kept, ignored } => write!(
                f,
                "{node} retains its declared scope {kept}, ignoring {ignored} from a transitive path"
            ),
            ManageVersion { node, from, to } => write!(f, "{node}: managed version {to} (was {from})"),
            ManageScope { node, from, to } => write!(f, "{node}: managed scope {to} (was {from})"),
            ManageSystemPath { node, path } => write!(f, "{node}: managed system path {path}"),
            SelectVersionFromRange { node, range, selected } => {
                write!(f, "{node}: selected {selected} from {range}")
            },
            RestrictRange { node, range, restricted } => {
                write!(f, "{node}: restricted {range} to {restricted}")
            },
            VersionConflict {
                key,
                kept,
                rejected,
                required_by,
            } => write!(
                f,
                "version conflict on {key}: kept {kept}, {required_by} requires {rejected}"
            ),
            Filtered { node, scope } => write!(f, "filtered {node} ({scope})"),
        }
    }
}

/// Receives collector events; `depth` is the node's distance from the root
pub trait ResolutionListener: Send + Sync {
    fn on_event(&self, event: &ResolutionEvent, depth: usize);
}

/// Fan-out to every registered listener
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn ResolutionListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn ResolutionListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: ResolutionEvent, depth: usize) {
        for listener in &self.listeners {
            listener.on_event(&event, depth);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Logs every event at debug level, indented by depth
#[derive(Debug, Default)]
pub struct DebugResolutionListener;

impl ResolutionListener for DebugResolutionListener {
    fn on_event(&self, event: &ResolutionEvent, depth: usize) {
        debug!("{}{}", "  ".repeat(depth), event);
    }
}

/// Warns about decisions a user probably wants to know about.
///
/// Each distinct warning is logged once per listener instance.
#[derive(Debug, Default)]
pub struct WarningResolutionListener {
    seen: Mutex<HashSet<String>>,
}

impl WarningResolutionListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings logged so far by this instance
    pub fn warning_count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl ResolutionListener for WarningResolutionListener {
    fn on_event(&self, event: &ResolutionEvent, _depth: usize) {
        let message = match event {
            ResolutionEvent::UpdateScopeCurrentPom { .. } | ResolutionEvent::VersionConflict { .. } => {
                event.to_string()
            },
            _ => return,
        };
        if self.seen.lock().insert(message.clone()) {
            warn!("{}", message);
        }
    }
}
