//! mvnr benchmarking suite
//!
//! Benchmarks for dependency collection over synthetic graphs and for
//! version parsing, ordering and range matching.

pub mod common;

pub use common::*;
