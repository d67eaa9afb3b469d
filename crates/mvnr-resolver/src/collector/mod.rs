//! Dependency graph collection
//!
//! Walks the declared dependencies breadth-first. Nodes are visited by
//! increasing depth and, within a depth, in declaration order, so the first
//! node seen for a conflict id is the nearest, first-declared one and wins
//! mediation; later contenders are recorded as omitted and not expanded.
//!
//! After the walk, scopes are settled: an artifact reached through several
//! paths takes the broadest of their scopes, and the change propagates to
//! its descendants. When the broader scope would admit children that the
//! narrower one pruned, the walk is repeated with that artifact expanded
//! under its settled scope from the start. Listeners only see the events of
//! the final walk. The artifact filter is applied last so that filtered
//! nodes still take part in mediation.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use mvnr_core::error::MvnrError;
use mvnr_core::types::{
    ArtifactCoordinate, ConflictId, Dependency, Exclusion, Scope, Version, VersionRange,
};
use mvnr_repository::{effective_repositories, ArtifactRepository};

use crate::cancel::CancellationToken;
use crate::filter::ArtifactFilter;
use crate::graph::{DependencyTree, GraphNode, NodeId, NodeStatus};
use crate::listener::{ListenerSet, ResolutionEvent, ResolutionListener};
use crate::managed::ManagedVersionMap;
use crate::mediation::{Contender, DeclarationPosition, ScopeMediator, VersionMediator};
use crate::metadata::MetadataSource;
use crate::ResolverResult;

/// Everything one collection needs
#[derive(Debug, Clone)]
pub struct CollectRequest {
    /// The artifact whose dependencies are collected
    pub root: ArtifactCoordinate,
    pub dependencies: Vec<Dependency>,
    pub managed: ManagedVersionMap,
    pub repositories: Vec<ArtifactRepository>,
    pub filter: Option<Arc<dyn ArtifactFilter>>,
}

impl CollectRequest {
    pub fn new(root: ArtifactCoordinate, repositories: Vec<ArtifactRepository>) -> Self {
        Self {
            root,
            dependencies: Vec::new(),
            managed: ManagedVersionMap::new(),
            repositories,
            filter: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_managed(mut self, managed: ManagedVersionMap) -> Self {
        self.managed = managed;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn ArtifactFilter>) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// An error attached to one node; the rest of the tree carried on without it
#[derive(Debug)]
pub struct NodeError {
    pub node: NodeId,
    pub coordinate: ArtifactCoordinate,
    pub error: MvnrError,
}

/// The collected tree plus everything that went wrong along the way
#[derive(Debug)]
pub struct CollectResult {
    pub tree: DependencyTree,
    pub errors: Vec<NodeError>,
    /// `VersionConflict` diagnostics; informational only
    pub conflicts: Vec<MvnrError>,
}

impl CollectResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Builds dependency trees from a metadata source
#[derive(Clone)]
pub struct DependencyCollector {
    metadata: Arc<dyn MetadataSource>,
    listeners: ListenerSet,
    cancel: CancellationToken,
}

impl std::fmt::Debug for DependencyCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyCollector")
            .field("listeners", &self.listeners)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl DependencyCollector {
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            metadata,
            listeners: ListenerSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ResolutionListener>) -> Self {
        self.listeners.add(listener);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataSource> {
        &self.metadata
    }

    /// Collect the tree for `request`.
    ///
    /// Fails only on a malformed request or cancellation; metadata failures
    /// and unresolvable versions are attached to the affected nodes.
    pub fn collect(&self, request: &CollectRequest) -> ResolverResult<CollectResult> {
        validate(request)?;

        let mut expand_as: HashMap<ConflictId, Scope> = HashMap::new();
        let mut walk = loop {
            let mut walk = Walk::new(self, request, expand_as.clone());
            let mut queue = VecDeque::from([NodeId::ROOT]);
            while let Some(id) = queue.pop_front() {
                self.cancel.check()?;
                walk.expand(id, &mut queue);
            }
            walk.settle_scopes();

            let revived = walk.revived_scopes();
            if revived.is_empty() {
                break walk;
            }
            for (conflict_id, scope) in revived {
                debug!("{} widened to {}, collecting again", conflict_id, scope);
                let current = expand_as.entry(conflict_id).or_insert(scope);
                *current = current.broadest(scope);
            }
        };
        walk.apply_filter();
        for (event, depth) in walk.events.take() {
            self.listeners.emit(event, depth);
        }

        debug!(
            "collected {} nodes for {} ({} errors)",
            walk.nodes.len(),
            request.root,
            walk.errors.len()
        );
        Ok(CollectResult {
            tree: DependencyTree::from_nodes(walk.nodes),
            errors: walk.errors,
            conflicts: walk.conflicts,
        })
    }
}

fn validate(request: &CollectRequest) -> ResolverResult<()> {
    request.root.validate()?;
    for repository in &request.repositories {
        if repository.id.trim().is_empty() || repository.url.trim().is_empty() {
            return Err(MvnrError::malformed(
                "repositories",
                format!("'{repository}' needs both an id and a url"),
            ));
        }
    }
    Ok(())
}

/// Mutable state of one collection; frozen into a `DependencyTree` at the end
struct Walk<'c> {
    collector: &'c DependencyCollector,
    request: &'c CollectRequest,
    nodes: Vec<GraphNode>,
    /// Exclusions in force below each node
    exclusions: Vec<Vec<Exclusion>>,
    /// Scope each node was first given
    initial_scopes: Vec<Scope>,
    /// Declared range of each winner
    ranges: HashMap<NodeId, VersionRange>,
    /// Scope a conflict id is expanded with when it wins, from an earlier walk
    expand_as: HashMap<ConflictId, Scope>,
    /// Declared scopes of the children each node's scope pruned
    pruned: HashMap<NodeId, Vec<Scope>>,
    /// Listener events, delivered once the final walk is known
    events: RefCell<Vec<(ResolutionEvent, usize)>>,
    winners: HashMap<ConflictId, NodeId>,
    losers: HashMap<NodeId, Vec<NodeId>>,
    errors: Vec<NodeError>,
    conflicts: Vec<MvnrError>,
}

impl<'c> Walk<'c> {
    fn new(
        collector: &'c DependencyCollector,
        request: &'c CollectRequest,
        expand_as: HashMap<ConflictId, Scope>,
    ) -> Self {
        let root = GraphNode {
            id: NodeId::ROOT,
            parent: None,
            coordinate: request.root.clone(),
            dependency: None,
            scope: Scope::Compile,
            optional: false,
            depth: 0,
            position: DeclarationPosition::root(),
            trail: vec![request.root.clone()],
            children: Vec::new(),
            repositories: effective_repositories(&request.repositories),
            status: NodeStatus::Root,
            error: None,
        };
        Self {
            collector,
            request,
            nodes: vec![root],
            exclusions: vec![Vec::new()],
            initial_scopes: vec![Scope::Compile],
            ranges: HashMap::new(),
            expand_as,
            pruned: HashMap::new(),
            events: RefCell::new(Vec::new()),
            winners: HashMap::new(),
            losers: HashMap::new(),
            errors: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    fn emit(&self, event: ResolutionEvent, depth: usize) {
        self.events.borrow_mut().push((event, depth));
    }

    fn attach_error(&mut self, id: NodeId, error: MvnrError) {
        let node = &mut self.nodes[id.index()];
        debug!("{}: {}", node.coordinate, error);
        node.error = Some(error.to_string());
        self.errors.push(NodeError {
            node: id,
            coordinate: node.coordinate.clone(),
            error,
        });
    }

    /// Read the parent's dependencies and add one child per surviving
    /// declaration; included children are queued for expansion
    fn expand(&mut self, parent_id: NodeId, queue: &mut VecDeque<NodeId>) {
        let parent = &self.nodes[parent_id.index()];
        let is_root = parent.is_root();
        let depth = parent.depth;
        let coordinate = parent.coordinate.clone();

        self.emit(
            ResolutionEvent::StartProcessChildren {
                node: coordinate.clone(),
            },
            depth,
        );

        let (declared, extra_repositories) = if is_root {
            (self.request.dependencies.clone(), Vec::new())
        } else {
            match self
                .collector
                .metadata
                .related_dependencies(&coordinate, &parent.repositories)
            {
                Ok(group) => (group.dependencies, group.repositories),
                Err(error) => {
                    self.attach_error(parent_id, error);
                    self.emit(ResolutionEvent::EndProcessChildren { node: coordinate }, depth);
                    return;
                },
            }
        };

        let parent = &self.nodes[parent_id.index()];
        let mut repositories = parent.repositories.clone();
        for repository in extra_repositories {
            if !repositories.iter().any(|r| r.id == repository.id) {
                repositories.push(repository);
            }
        }
        let inherited = self.exclusions[parent_id.index()].clone();

        let mut index = 0;
        for dependency in declared {
            let key = dependency.key();
            if inherited.iter().any(|e| e.matches(&key)) {
                trace!("{} excluded below {}", key, coordinate);
                continue;
            }
            let position = self.nodes[parent_id.index()].position.child(index);
            index += 1;
            if !is_root && dependency.optional {
                trace!("skipping optional {} of {}", key, coordinate);
                continue;
            }
            if let Some(child) = self.add_child(parent_id, dependency, position, &repositories, &inherited) {
                queue.push_back(child);
            }
        }

        self.emit(ResolutionEvent::EndProcessChildren { node: coordinate }, depth);
    }

    /// Add one declared dependency below `parent_id`. Returns the node when
    /// it was included and should be expanded.
    fn add_child(
        &mut self,
        parent_id: NodeId,
        declared: Dependency,
        position: DeclarationPosition,
        repositories: &[ArtifactRepository],
        inherited: &[Exclusion],
    ) -> Option<NodeId> {
        let parent = &self.nodes[parent_id.index()];
        let direct = parent.is_root();
        let depth = parent.depth + 1;
        let parent_scope = parent.scope;
        let parent_coordinate = parent.coordinate.clone();

        let dependency = self.manage(declared, direct, depth);
        self.emit(
            ResolutionEvent::TestArtifact {
                node: dependency.coordinate.clone(),
            },
            depth,
        );

        let declared_scope = dependency.effective_scope();
        let scope = if direct {
            declared_scope
        } else {
            match ScopeMediator::widen(parent_scope, declared_scope) {
                Some(scope) => scope,
                None => {
                    trace!(
                        "{} ({}) not visible through {} ({})",
                        dependency.coordinate,
                        declared_scope,
                        parent_coordinate,
                        parent_scope
                    );
                    self.pruned.entry(parent_id).or_default().push(declared_scope);
                    return None;
                },
            }
        };

        let parent = &self.nodes[parent_id.index()];
        let key = dependency.key();
        let in_cycle = parent.trail.iter().any(|c| c.key() == key);
        let mut exclusions = inherited.to_vec();
        for exclusion in &dependency.exclusions {
            if !exclusions.contains(exclusion) {
                exclusions.push(exclusion.clone());
            }
        }

        let id = NodeId::from(self.nodes.len());
        let node = GraphNode {
            id,
            parent: Some(parent_id),
            coordinate: dependency.coordinate.clone(),
            dependency: Some(dependency.clone()),
            scope,
            optional: dependency.optional,
            depth,
            position: position.clone(),
            trail: parent.trail.clone(),
            children: Vec::new(),
            repositories: repositories.to_vec(),
            status: NodeStatus::Unresolvable,
            error: None,
        };
        self.nodes.push(node);
        self.exclusions.push(exclusions);
        self.initial_scopes.push(scope);
        self.nodes[parent_id.index()].children.push(id);

        if in_cycle {
            self.set_status(id, NodeStatus::OmittedForCycle);
            self.emit(
                ResolutionEvent::OmitForCycle {
                    node: dependency.coordinate.clone(),
                },
                depth,
            );
            return None;
        }

        if !dependency.has_version() {
            self.attach_error(
                id,
                MvnrError::malformed(
                    dependency.coordinate.to_string(),
                    "no version is declared or managed",
                ),
            );
            return None;
        }
        let range = match VersionRange::parse(dependency.version_spec()) {
            Ok(range) => range,
            Err(e) => {
                self.attach_error(
                    id,
                    MvnrError::InvalidVersion {
                        input: dependency.version_spec().to_string(),
                        reason: e.to_string(),
                    },
                );
                return None;
            },
        };

        let conflict_id = dependency.conflict_id();
        if let Some(&winner) = self.winners.get(&conflict_id) {
            self.omit_for_nearer(id, winner, &dependency, &range, &parent_coordinate, &position);
            return None;
        }

        let version = match range.recommended() {
            Some(version) => version.as_str().to_string(),
            None => self.select_from_range(id, &dependency, &range, repositories)?,
        };

        let expand_scope = match self.expand_as.get(&conflict_id) {
            Some(&widened) if !direct => scope.broadest(widened),
            _ => scope,
        };
        let coordinate = dependency.coordinate.with_version(version);
        let node = &mut self.nodes[id.index()];
        node.coordinate = coordinate.clone();
        node.trail.push(coordinate.clone());
        node.status = NodeStatus::Included;
        node.scope = expand_scope;
        self.winners.insert(conflict_id, id);
        self.ranges.insert(id, range);
        self.emit(
            ResolutionEvent::IncludeArtifact {
                node: coordinate,
                scope,
            },
            depth,
        );

        // Nothing is reached through a system dependency
        (scope != Scope::System).then_some(id)
    }

    fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        self.nodes[id.index()].status = status;
    }

    /// Apply dependency management to a declaration.
    ///
    /// Transitive declarations take the managed version and scope; direct
    /// declarations only have missing values filled in. The originating
    /// artifact is never managed.
    fn manage(&self, declared: Dependency, direct: bool, depth: usize) -> Dependency {
        let key = declared.key();
        if key == self.request.root.key() {
            return declared;
        }
        let Some(managed) = self.request.managed.get(&key) else {
            return declared;
        };

        let mut dependency = declared;
        if managed.has_version()
            && (!direct || !dependency.has_version())
            && managed.version_spec() != dependency.version_spec()
        {
            self.emit(
                ResolutionEvent::ManageVersion {
                    node: dependency.coordinate.clone(),
                    from: dependency.version_spec().to_string(),
                    to: managed.version_spec().to_string(),
                },
                depth,
            );
            dependency.coordinate.version = managed.version_spec().to_string();
        }
        if let Some(scope) = managed.scope {
            if (!direct || dependency.scope.is_none()) && dependency.scope != Some(scope) {
                self.emit(
                    ResolutionEvent::ManageScope {
                        node: dependency.coordinate.clone(),
                        from: dependency.effective_scope(),
                        to: scope,
                    },
                    depth,
                );
                dependency.scope = Some(scope);
            }
        }
        if let Some(path) = &managed.system_path {
            if (!direct || dependency.system_path.is_none())
                && dependency.system_path.as_ref() != Some(path)
            {
                self.emit(
                    ResolutionEvent::ManageSystemPath {
                        node: dependency.coordinate.clone(),
                        path: path.clone(),
                    },
                    depth,
                );
                dependency.system_path = Some(path.clone());
            }
        }
        for exclusion in &managed.exclusions {
            if !dependency.exclusions.contains(exclusion) {
                dependency.exclusions.push(exclusion.clone());
            }
        }
        dependency
    }

    /// Record `id` as losing to `winner` and check its range against the
    /// version that won
    fn omit_for_nearer(
        &mut self,
        id: NodeId,
        winner: NodeId,
        dependency: &Dependency,
        range: &VersionRange,
        required_by: &ArtifactCoordinate,
        position: &DeclarationPosition,
    ) {
        let kept = &self.nodes[winner.index()];
        let depth = position.depth();
        if let Some(existing) = &kept.dependency {
            let mediated = VersionMediator::with_managed(&self.request.managed).mediate(
                &Contender::new(existing.clone(), kept.position.clone()),
                &Contender::new(dependency.clone(), position.clone()),
            );
            debug_assert!(
                mediated.keeps_existing(),
                "breadth-first order reaches the nearest, first-declared contender first"
            );
            trace!("{} kept over {} ({:?})", kept.coordinate, dependency.coordinate, mediated.decision);
        }
        let kept_coordinate = kept.coordinate.clone();

        if let Some(recommended) = range.recommended() {
            let coordinate = dependency.coordinate.with_version(recommended.as_str());
            self.nodes[id.index()].coordinate = coordinate;
        }
        self.set_status(id, NodeStatus::OmittedForNearer { kept: winner });
        self.losers.entry(winner).or_default().push(id);
        self.emit(
            ResolutionEvent::OmitForNearer {
                omitted: self.nodes[id.index()].coordinate.clone(),
                kept: kept_coordinate.clone(),
            },
            depth,
        );

        if !range.has_restrictions() {
            return;
        }
        if let Some(kept_range) = self.ranges.get(&winner).filter(|r| r.has_restrictions()) {
            let restricted = kept_range.restrict(range);
            self.emit(
                ResolutionEvent::RestrictRange {
                    node: kept_coordinate.clone(),
                    range: kept_range.to_string(),
                    restricted: restricted.to_string(),
                },
                depth,
            );
        }
        let kept_version = kept_coordinate.version.parse::<Version>();
        if kept_version.map_or(true, |v| !range.contains(&v)) {
            let conflict = MvnrError::VersionConflict {
                key: dependency.key().to_string(),
                kept: kept_coordinate.version.clone(),
                rejected: range.to_string(),
                required_by: required_by.to_string(),
            };
            self.emit(
                ResolutionEvent::VersionConflict {
                    key: dependency.key(),
                    kept: kept_coordinate.version.clone(),
                    rejected: range.to_string(),
                    required_by: required_by.to_string(),
                },
                depth,
            );
            self.conflicts.push(conflict);
        }
    }

    /// Highest available version inside a hard range
    fn select_from_range(
        &mut self,
        id: NodeId,
        dependency: &Dependency,
        range: &VersionRange,
        repositories: &[ArtifactRepository],
    ) -> Option<String> {
        let available = match self
            .collector
            .metadata
            .available_versions(&dependency.coordinate, repositories)
        {
            Ok(available) => available,
            Err(error) => {
                self.attach_error(id, error);
                return None;
            },
        };
        match range.match_version(&available) {
            Some(selected) => {
                self.emit(
                    ResolutionEvent::SelectVersionFromRange {
                        node: dependency.coordinate.clone(),
                        range: range.to_string(),
                        selected: selected.to_string(),
                    },
                    self.nodes[id.index()].depth,
                );
                Some(selected.as_str().to_string())
            },
            None => {
                let mut listed: Vec<&Version> = available.iter().collect();
                listed.sort();
                let available = listed
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.attach_error(
                    id,
                    MvnrError::OverConstrainedVersion {
                        key: dependency.key().to_string(),
                        range: range.to_string(),
                        available,
                    },
                );
                None
            },
        }
    }

    /// Path scope of a non-root node given its parent's current scope
    fn path_scope(&self, node: &GraphNode) -> Scope {
        let declared = node
            .dependency
            .as_ref()
            .map(Dependency::effective_scope)
            .unwrap_or_default();
        match node.parent.map(|p| &self.nodes[p.index()]) {
            Some(parent) if !parent.is_root() => {
                ScopeMediator::widen(parent.scope, declared).unwrap_or(node.scope)
            },
            _ => declared,
        }
    }

    /// Give every artifact the broadest scope among the paths reaching it.
    ///
    /// Scopes only ever widen, so repeating until nothing changes terminates.
    /// Direct dependencies keep their declared scope.
    fn settle_scopes(&mut self) {
        loop {
            let mut changed = false;
            for index in 1..self.nodes.len() {
                let node = &self.nodes[index];
                let direct = node.parent == Some(NodeId::ROOT);
                let mut scope = node.scope;
                match node.status {
                    NodeStatus::Included if !direct => {
                        scope = ScopeMediator::merge(scope, self.path_scope(node)).scope();
                        for loser in self.losers.get(&node.id).into_iter().flatten() {
                            scope = ScopeMediator::merge(scope, self.nodes[loser.index()].scope).scope();
                        }
                    },
                    NodeStatus::OmittedForNearer { .. } => {
                        scope = ScopeMediator::merge(scope, self.path_scope(node)).scope();
                    },
                    _ => continue,
                }
                if scope != self.nodes[index].scope {
                    self.nodes[index].scope = scope;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut mediator = ScopeMediator::new();
        for node in self.nodes.iter().filter(|n| n.is_included()) {
            let direct = node.parent == Some(NodeId::ROOT);
            if direct {
                let ignored = self
                    .losers
                    .get(&node.id)
                    .into_iter()
                    .flatten()
                    .map(|l| self.nodes[l.index()].scope)
                    .filter(|s| s.widens(node.scope))
                    .reduce(Scope::broadest);
                if let Some(ignored) = ignored {
                    self.emit(
                        ResolutionEvent::UpdateScopeCurrentPom {
                            node: node.coordinate.clone(),
                            kept: node.scope,
                            ignored,
                        },
                        node.depth,
                    );
                }
                continue;
            }
            let initial = self.initial_scopes[node.id.index()];
            if node.scope != initial && mediator.should_report(&node.coordinate.conflict_id()) {
                debug!("{} widened from {} to {}", node.coordinate, initial, node.scope);
                self.emit(
                    ResolutionEvent::UpdateScope {
                        node: node.coordinate.clone(),
                        from: initial,
                        to: node.scope,
                    },
                    node.depth,
                );
            }
        }
    }

    /// Settled scopes of included nodes that would now admit children their
    /// expansion scope pruned
    fn revived_scopes(&self) -> Vec<(ConflictId, Scope)> {
        self.pruned
            .iter()
            .filter_map(|(id, declared)| {
                let node = &self.nodes[id.index()];
                let admits = declared
                    .iter()
                    .any(|&scope| ScopeMediator::widen(node.scope, scope).is_some());
                (node.is_included() && admits).then(|| (node.coordinate.conflict_id(), node.scope))
            })
            .collect()
    }

    /// Mark included nodes the filter rejects, and everything below them
    fn apply_filter(&mut self) {
        let Some(filter) = self.request.filter.clone() else {
            return;
        };
        for index in 1..self.nodes.len() {
            let node = &self.nodes[index];
            if !node.is_included() {
                continue;
            }
            let parent_filtered = node
                .parent
                .is_some_and(|p| self.nodes[p.index()].status == NodeStatus::Filtered);
            if parent_filtered || !filter.include(&node.coordinate, node.scope) {
                let event = ResolutionEvent::Filtered {
                    node: node.coordinate.clone(),
                    scope: node.scope,
                };
                let depth = node.depth;
                self.nodes[index].status = NodeStatus::Filtered;
                self.emit(event, depth);
            }
        }
    }
}
