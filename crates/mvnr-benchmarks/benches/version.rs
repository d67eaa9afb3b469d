//! Version parsing, ordering and range matching benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mvnr_benchmarks::criterion_config;
use mvnr_core::types::{Version, VersionRange};

const SAMPLES: &[&str] = &[
    "1.0",
    "1.0.0",
    "2.3.4-SNAPSHOT",
    "1.0-alpha-1",
    "1.0-rc2",
    "3.2.1.Final",
    "1.0-20240101.120000-3",
    "10.0.0-sp1",
];

fn version_list(count: usize) -> Vec<Version> {
    (0..count)
        .map(|i| format!("{}.{}.{}", i % 7, i % 13, i).parse().unwrap())
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("version_parse", |b| {
        b.iter(|| {
            for sample in SAMPLES {
                black_box(sample.parse::<Version>().unwrap());
            }
        })
    });

    c.bench_function("range_parse", |b| {
        b.iter(|| {
            black_box(VersionRange::parse("[1.0,2.0)").unwrap());
            black_box(VersionRange::parse("(,1.0],[1.2,)").unwrap());
            black_box(VersionRange::parse("1.5").unwrap());
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_sort");
    for count in [100, 1000] {
        let versions = version_list(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &versions, |b, versions| {
            b.iter(|| {
                let mut sorted = versions.clone();
                sorted.sort();
                black_box(sorted)
            })
        });
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let range = VersionRange::parse("[2.0,5.0)").unwrap();
    let mut versions = version_list(500);
    versions.sort();

    c.bench_function("range_match_500", |b| {
        b.iter(|| black_box(range.match_version(&versions)))
    });
}

criterion_group!(
    name = benches;
    config = criterion_config();
    targets = bench_parse, bench_sort, bench_match
);
criterion_main!(benches);
