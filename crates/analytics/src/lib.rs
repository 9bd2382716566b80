// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Timeline range analytics and policy comparison.
//!
//! Two halves live here. The range-analytics half answers window queries
//! over the CPU timeline (busy/idle counts through a Fenwick tree, longest
//! busy/idle runs through a segment tree) and maintains itself
//! incrementally against the growing timeline. The comparator half replays
//! one workload under every supported policy, derives fairness statistics,
//! a Pareto front and a weighted ranking per optimization mode.

/// Policy comparison: fairness, Pareto front, weighted ranking.
pub mod comparator;
/// Prefix sums over busy bits with amortized append.
pub mod fenwick;
/// Longest-run queries over busy bits.
pub mod segtree;
/// Incrementally maintained CPU-timeline analytics.
pub mod timeline;

pub use comparator::{ComparisonReport, Confidence, OptimizeMode, compare};
pub use fenwick::BitFenwick;
pub use segtree::{RunSegTree, RunStats};
pub use timeline::TimelineStats;

/// Errors raised by the analytics layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for engine errors raised while replaying a workload.
    #[error("simulation failed during comparison: {0}")]
    Engine(#[from] schedsim_engine::Error),

    /// The comparator needs at least one process to compare policies.
    #[error("cannot compare policies over an empty workload")]
    EmptyWorkload,
}
