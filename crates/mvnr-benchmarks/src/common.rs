//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use mvnr_core::types::{ArtifactCoordinate, Dependency};
use mvnr_resolver::InMemoryMetadataSource;

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Coordinate of node `index` at `level` in a synthetic graph
pub fn node(level: usize, index: usize, version: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::new("org.bench", format!("lib-{level}-{index}"), version)
}

/// A layered graph: `width` artifacts per level, each depending on every
/// artifact of the next level. Even levels ask for version 1.0 and odd
/// levels for 2.0, so every artifact below the first level is mediated.
pub fn layered_graph(levels: usize, width: usize) -> (Vec<Dependency>, InMemoryMetadataSource) {
    let version = |level: usize| if level % 2 == 0 { "1.0" } else { "2.0" };
    let mut source = InMemoryMetadataSource::new();

    for level in 0..levels {
        let children: Vec<Dependency> = if level + 1 < levels {
            (0..width)
                .map(|i| Dependency::new(node(level + 1, i, version(level))))
                .collect()
        } else {
            Vec::new()
        };
        for i in 0..width {
            for v in ["1.0", "2.0"] {
                source = source.with(&node(level, i, v), children.clone());
            }
        }
    }

    let roots = (0..width).map(|i| Dependency::new(node(0, i, "1.0"))).collect();
    (roots, source)
}
