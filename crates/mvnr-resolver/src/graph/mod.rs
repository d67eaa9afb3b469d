//! The collected dependency tree and a petgraph view of it
//!
//! `DependencyTree` is the collector's output: an arena of immutable
//! `GraphNode`s in breadth-first order, with every omitted node kept for
//! diagnostics. `DependencyGraph` is the deduplicated artifact graph built
//! from the included nodes.

use camino::Utf8Path;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use mvnr_core::error::{MvnrError, MvnrResult};
use mvnr_core::types::{ArtifactCoordinate, ConflictId, Dependency, Scope};
use mvnr_repository::ArtifactRepository;

use crate::capability::Versioned;
use crate::mediation::DeclarationPosition;

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the collector decided about a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    /// The originating artifact
    Root,
    Included,
    /// Lost mediation to `kept`
    OmittedForNearer { kept: NodeId },
    /// Its management key already appears among its ancestors
    OmittedForCycle,
    /// Rejected by the request's artifact filter, itself or through an ancestor
    Filtered,
    /// No usable version could be determined
    Unresolvable,
}

/// One declaration reached during collection.
///
/// Never changes once the collector hands the tree out; resolution results
/// live in separate `ResolvedArtifact` records.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Selected coordinate, version settled
    pub coordinate: ArtifactCoordinate,
    /// Declaration after dependency management; `None` for the root
    pub dependency: Option<Dependency>,
    pub scope: Scope,
    pub optional: bool,
    pub depth: usize,
    pub position: DeclarationPosition,
    /// Coordinates from the root down to this node, inclusive
    pub trail: Vec<ArtifactCoordinate>,
    pub children: Vec<NodeId>,
    /// Repositories visible at this point in the tree
    pub repositories: Vec<ArtifactRepository>,
    pub status: NodeStatus,
    /// Message of the error attached to this node, if any
    pub error: Option<String>,
}

impl GraphNode {
    pub fn is_root(&self) -> bool {
        self.status == NodeStatus::Root
    }

    pub fn is_included(&self) -> bool {
        self.status == NodeStatus::Included
    }

    pub fn system_path(&self) -> Option<&Utf8Path> {
        self.dependency.as_ref()?.system_path.as_deref()
    }

    /// `g:a:ext[:classifier]:version:scope`
    pub fn label(&self) -> String {
        if self.is_root() {
            self.coordinate.to_string()
        } else {
            format!("{}:{}", self.coordinate, self.scope)
        }
    }
}

impl Versioned for GraphNode {
    fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }
}

/// Arena of collected nodes; the root is always `NodeId::ROOT`
#[derive(Debug, Clone)]
pub struct DependencyTree {
    nodes: Vec<GraphNode>,
}

impl DependencyTree {
    /// Nodes must be in breadth-first order with the root first
    pub(crate) fn from_nodes(nodes: Vec<GraphNode>) -> Self {
        Self { nodes }
    }

    pub fn root(&self) -> &GraphNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    /// Every node, omitted ones included, in breadth-first order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &GraphNode> {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.node(*child))
    }

    /// Accepted artifacts, nearest first and in declaration order
    pub fn flatten(&self) -> Vec<&GraphNode> {
        self.nodes.iter().filter(|n| n.is_included()).collect()
    }

    /// The included node for `id`, if any
    pub fn find(&self, id: &ConflictId) -> Option<&GraphNode> {
        self.nodes
            .iter()
            .find(|n| n.is_included() && n.coordinate.conflict_id() == *id)
    }

    pub fn count(&self, matches: impl Fn(&NodeStatus) -> bool) -> usize {
        self.nodes.iter().filter(|n| matches(&n.status)).count()
    }

    /// Text rendering in the familiar `dependency:tree` style, omitted
    /// nodes shown in parentheses
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.root().label());
        out.push('\n');
        let children: Vec<_> = self.children(NodeId::ROOT).collect();
        for (i, child) in children.iter().enumerate() {
            self.render_node(child, "", i + 1 == children.len(), &mut out);
        }
        out
    }

    fn render_node(&self, node: &GraphNode, prefix: &str, last: bool, out: &mut String) {
        out.push_str(prefix);
        out.push_str(if last { "\\- " } else { "+- " });
        match &node.status {
            NodeStatus::Included => out.push_str(&node.label()),
            NodeStatus::OmittedForNearer { kept } => {
                let kept_version = self
                    .node(*kept)
                    .map(|k| k.coordinate.version.as_str())
                    .unwrap_or("?");
                let reason = if kept_version == node.coordinate.version {
                    "omitted for duplicate".to_string()
                } else {
                    format!("omitted for conflict with {kept_version}")
                };
                out.push_str(&format!("({} - {})", node.label(), reason));
            },
            NodeStatus::OmittedForCycle => {
                out.push_str(&format!("({} - omitted for cycle)", node.label()))
            },
            NodeStatus::Filtered => out.push_str(&format!("({} - filtered)", node.label())),
            NodeStatus::Unresolvable => out.push_str(&format!(
                "({} - {})",
                node.label(),
                node.error.as_deref().unwrap_or("unresolvable")
            )),
            NodeStatus::Root => out.push_str(&node.label()),
        }
        if node.is_included() {
            if let Some(error) = &node.error {
                out.push_str(&format!(" [error: {error}]"));
            }
        }
        out.push('\n');

        let child_prefix = format!("{prefix}{}", if last { "   " } else { "|  " });
        let children: Vec<_> = self.children(node.id).collect();
        for (i, child) in children.iter().enumerate() {
            self.render_node(child, &child_prefix, i + 1 == children.len(), out);
        }
    }

    /// Artifact graph of the included nodes
    pub fn to_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in self.nodes.iter().filter(|n| n.is_included() || n.is_root()) {
            graph.add_artifact(node.coordinate.clone(), node.scope);
        }
        for node in &self.nodes {
            let Some(parent) = node.parent.and_then(|p| self.node(p)) else {
                continue;
            };
            if !(parent.is_included() || parent.is_root()) {
                continue;
            }
            let target = match &node.status {
                NodeStatus::Included => Some(node),
                NodeStatus::OmittedForNearer { kept } => self.node(*kept),
                _ => None,
            };
            if let Some(target) = target {
                graph.add_dependency(&parent.coordinate, &target.coordinate);
            }
        }
        graph
    }
}

impl fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Deduplicated artifact graph: one vertex per conflict id, an edge from
/// each artifact to every artifact it depends on
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<(ArtifactCoordinate, Scope), ()>,
    index: HashMap<ConflictId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artifact(&mut self, coordinate: ArtifactCoordinate, scope: Scope) -> NodeIndex {
        let id = coordinate.conflict_id();
        if let Some(existing) = self.index.get(&id) {
            return *existing;
        }
        let index = self.graph.add_node((coordinate, scope));
        self.index.insert(id, index);
        index
    }

    /// Record that `from` depends on `to`; both must have been added
    pub fn add_dependency(&mut self, from: &ArtifactCoordinate, to: &ArtifactCoordinate) -> bool {
        let (Some(from), Some(to)) = (
            self.index.get(&from.conflict_id()).copied(),
            self.index.get(&to.conflict_id()).copied(),
        ) else {
            return false;
        };
        if from == to || self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    pub fn artifact_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of `coordinate`
    pub fn dependencies_of(&self, coordinate: &ArtifactCoordinate) -> Vec<&ArtifactCoordinate> {
        let Some(index) = self.index.get(&coordinate.conflict_id()) else {
            return Vec::new();
        };
        let mut deps: Vec<_> = self
            .graph
            .neighbors(*index)
            .filter_map(|n| self.graph.node_weight(n))
            .map(|(c, _)| c)
            .collect();
        deps.sort();
        deps
    }

    /// Every artifact after the artifacts it depends on
    pub fn topological_order(&self) -> MvnrResult<Vec<ArtifactCoordinate>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .rev()
                .filter_map(|idx| self.graph.node_weight(idx))
                .map(|(c, _)| c.clone())
                .collect()),
            Err(cycle) => {
                let at = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map(|(c, _)| c.to_string())
                    .unwrap_or_default();
                Err(MvnrError::CycleDetected {
                    cycle: format!("{at} depends on itself through its dependencies"),
                })
            },
        }
    }
}
