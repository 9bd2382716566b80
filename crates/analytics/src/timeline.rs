// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Incrementally maintained analytics over the CPU timeline.
//!
//! The structures track the busy bit of every tick (any token other than
//! `"IDLE"`). On each sync the new timeline is compared against the applied
//! prefix: matching prefixes only append the tail, while any mismatch (a
//! reset, a removed process, a policy change) rebuilds both structures from
//! scratch.

use crate::fenwick::BitFenwick;
use crate::segtree::RunSegTree;

/// Timeline token for an idle tick.
const IDLE_TOKEN: &str = "IDLE";

/// Window analytics over the CPU timeline.
#[derive(Debug, Clone, Default)]
pub struct TimelineStats {
    applied: Vec<String>,
    sums: BitFenwick,
    runs: RunSegTree,
}

impl TimelineStats {
    /// Creates empty analytics.
    #[must_use]
    pub fn new() -> Self {
        TimelineStats::default()
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    /// Returns `true` when no tick has been applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Brings the analytics up to date with `timeline`.
    ///
    /// Appends incrementally when the applied prefix still matches,
    /// otherwise rebuilds from scratch.
    pub fn sync(&mut self, timeline: &[String]) {
        let prefix_matches = timeline.len() >= self.applied.len()
            && self
                .applied
                .iter()
                .zip(timeline.iter())
                .all(|(a, b)| a == b);
        if !prefix_matches {
            self.applied.clear();
            self.sums = BitFenwick::new();
            self.runs = RunSegTree::new();
        }
        for token in &timeline[self.applied.len()..] {
            let busy = token != IDLE_TOKEN;
            self.sums.append(busy);
            self.runs.append(busy);
            self.applied.push(token.clone());
        }
    }

    /// Busy ticks in the inclusive window `l..=r`.
    #[must_use]
    pub fn busy_in(&self, l: usize, r: usize) -> u64 {
        self.sums.range_sum(l, self.clamp(r))
    }

    /// Idle ticks in the inclusive window `l..=r`.
    #[must_use]
    pub fn idle_in(&self, l: usize, r: usize) -> u64 {
        let r = self.clamp(r);
        if l > r || self.applied.is_empty() {
            return 0;
        }
        (r - l + 1) as u64 - self.busy_in(l, r)
    }

    /// Utilization percentage over the inclusive window `l..=r`.
    #[must_use]
    pub fn utilization(&self, l: usize, r: usize) -> f64 {
        let r = self.clamp(r);
        if l > r || self.applied.is_empty() {
            return 0.0;
        }
        let width = (r - l + 1) as f64;
        self.busy_in(l, r) as f64 / width * 100.0
    }

    /// Longest consecutive busy run in the inclusive window `l..=r`.
    #[must_use]
    pub fn longest_busy(&self, l: usize, r: usize) -> u32 {
        self.runs.query(l, self.clamp(r)).best1
    }

    /// Longest consecutive idle run in the inclusive window `l..=r`.
    #[must_use]
    pub fn longest_idle(&self, l: usize, r: usize) -> u32 {
        self.runs.query(l, self.clamp(r)).best0
    }

    fn clamp(&self, r: usize) -> usize {
        if self.applied.is_empty() {
            0
        } else {
            r.min(self.applied.len() - 1)
        }
    }
}
