//! Collect a tree, then resolve every artifact it includes
//!
//! Resolution starts only after mediation has settled, so the order in which
//! files are fetched cannot change which versions were chosen. Fetches may
//! then run on a rayon pool; results are reported in tree order regardless.

use camino::Utf8Path;
use rayon::prelude::*;
use tracing::{debug, info};

use mvnr_core::error::MvnrError;
use mvnr_core::types::ArtifactCoordinate;

use crate::capability::{Resolvable, Versioned};
use crate::collector::{CollectRequest, DependencyCollector, NodeError};
use crate::graph::{DependencyTree, GraphNode};
use crate::resolver::{ArtifactRequest, ArtifactResolver, ResolvedArtifact};
use crate::ResolverResult;

/// Everything a transitive resolution produced
#[derive(Debug)]
pub struct ArtifactResolutionResult {
    pub tree: DependencyTree,
    /// Resolved files, in tree order
    pub artifacts: Vec<ResolvedArtifact>,
    /// Artifacts confirmed absent everywhere
    pub missing: Vec<ArtifactCoordinate>,
    /// Collection and transfer errors other than absence
    pub failures: Vec<NodeError>,
    /// `VersionConflict` diagnostics from collection
    pub conflicts: Vec<MvnrError>,
}

impl ArtifactResolutionResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failures.is_empty()
    }

    /// Resolved files in tree order, the classpath of the request
    pub fn files(&self) -> Vec<&Utf8Path> {
        self.artifacts.iter().filter_map(|a| a.file()).collect()
    }

    /// The resolved record for a collected node
    pub fn artifact_for(&self, node: &GraphNode) -> Option<&ResolvedArtifact> {
        let id = node.conflict_id();
        self.artifacts.iter().find(|a| a.conflict_id() == id)
    }

    /// Turn an incomplete result into an error.
    ///
    /// Failures take precedence; otherwise every missing artifact is listed
    /// in one `MultipleArtifactsNotFound`.
    pub fn ensure_complete(mut self) -> ResolverResult<Self> {
        if !self.failures.is_empty() {
            return Err(self.failures.swap_remove(0).error);
        }
        if !self.missing.is_empty() {
            return Err(MvnrError::MultipleArtifactsNotFound {
                missing: self.missing.iter().map(ToString::to_string).collect(),
            });
        }
        Ok(self)
    }
}

/// Collection followed by artifact resolution
#[derive(Debug, Clone)]
pub struct TransitiveResolver {
    collector: DependencyCollector,
    resolver: ArtifactResolver,
    jobs: usize,
    force: bool,
}

impl TransitiveResolver {
    pub fn new(collector: DependencyCollector, resolver: ArtifactResolver) -> Self {
        Self {
            collector,
            resolver,
            jobs: 1,
            force: false,
        }
    }

    /// Fetch on up to `jobs` threads; 1 resolves on the calling thread
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Re-download artifacts even when a local copy exists
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn collector(&self) -> &DependencyCollector {
        &self.collector
    }

    pub fn resolver(&self) -> &ArtifactResolver {
        &self.resolver
    }

    /// Collect the tree for `request` and resolve every included node.
    ///
    /// Missing and failed artifacts are gathered in the result; only malformed
    /// input and cancellation fail the call.
    pub fn resolve(&self, request: &CollectRequest) -> ResolverResult<ArtifactResolutionResult> {
        let collected = self.collector.collect(request)?;
        let tree = collected.tree;

        let mut missing = Vec::new();
        let mut failures = Vec::new();
        for error in collected.errors {
            if error.error.is_not_found() {
                missing.push(error.coordinate);
            } else {
                failures.push(error);
            }
        }

        let nodes = tree.flatten();
        debug!("resolving {} artifacts with {} jobs", nodes.len(), self.jobs);
        let outcomes = self.resolve_nodes(&nodes)?;

        let mut artifacts = Vec::with_capacity(outcomes.len());
        for (node, outcome) in nodes.iter().zip(outcomes) {
            match outcome {
                Ok(artifact) => artifacts.push(artifact),
                Err(MvnrError::Cancelled) => return Err(MvnrError::Cancelled),
                Err(error) if error.is_not_found() => missing.push(node.coordinate.clone()),
                Err(error) => failures.push(NodeError {
                    node: node.id,
                    coordinate: node.coordinate.clone(),
                    error,
                }),
            }
        }

        info!(
            "resolved {} artifacts ({} missing, {} failed)",
            artifacts.len(),
            missing.len(),
            failures.len()
        );
        Ok(ArtifactResolutionResult {
            tree,
            artifacts,
            missing,
            failures,
            conflicts: collected.conflicts,
        })
    }

    fn resolve_nodes(&self, nodes: &[&GraphNode]) -> ResolverResult<Vec<ResolverResult<ResolvedArtifact>>> {
        let resolve = |node: &&GraphNode| {
            self.resolver
                .resolve(&ArtifactRequest::from_node(node).forced(self.force))
        };
        if self.jobs == 1 {
            return Ok(nodes.iter().map(resolve).collect());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| MvnrError::resolution("thread pool", "could not start download threads", e))?;
        Ok(pool.install(|| nodes.par_iter().map(resolve).collect()))
    }
}
