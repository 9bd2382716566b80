// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic virtual-address generators.
//!
//! Every pattern is a pure function of the descriptor it was built from:
//! SEQ and LOOP walk the working set with a cursor, RAND draws from a PRNG
//! seeded by the process descriptor, and CUSTOM cycles a user list. Two
//! runs over the same workload therefore emit identical reference strings.

use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use schedsim_config::{MemorySpec, RefPattern};

/// Number of working-set pages the LOOP pattern cycles over.
const LOOP_WINDOW: usize = 3;

/// Deterministic per-process virtual-address stream.
#[derive(Debug, Clone)]
pub struct AddrStream {
    pattern: RefPattern,
    base: u64,
    page_size: u64,
    working_set: Vec<u64>,
    custom: Vec<u64>,
    cursor: usize,
    rng: SmallRng,
}

impl AddrStream {
    /// Builds the stream for one process under the given global page size.
    #[must_use]
    pub fn new(spec: &MemorySpec, page_size: u64) -> Self {
        let max_pages = (spec.vm_size / page_size).max(1);
        let working_set: Vec<u64> = match &spec.pages {
            Some(pages) if !pages.is_empty() => pages.iter().map(|&v| v % max_pages).collect(),
            _ => {
                let count = spec.working_set.max(1);
                (0..count as u64).map(|v| v % max_pages).collect()
            }
        };
        AddrStream {
            pattern: spec.pattern,
            base: spec.base,
            page_size,
            working_set,
            custom: spec.custom_addrs.clone(),
            cursor: 0,
            rng: SmallRng::seed_from_u64(spec.seed),
        }
    }

    /// The working-set VPNs this stream draws from.
    #[must_use]
    pub fn working_set(&self) -> &[u64] {
        &self.working_set
    }

    /// Emits the next virtual address of the reference string.
    pub fn next_va(&mut self) -> u64 {
        let vpn = match self.pattern {
            RefPattern::Seq => {
                let vpn = self.working_set[self.cursor % self.working_set.len()];
                self.cursor += 1;
                vpn
            }
            RefPattern::Loop => {
                let window = self.working_set.len().min(LOOP_WINDOW);
                let vpn = self.working_set[self.cursor % window];
                self.cursor += 1;
                vpn
            }
            RefPattern::Rand => {
                let idx = self.rng.random_range(0..self.working_set.len());
                self.working_set[idx]
            }
            RefPattern::Custom => {
                let va = self.custom[self.cursor % self.custom.len()];
                self.cursor += 1;
                return va;
            }
        };
        self.base + vpn * self.page_size
    }
}
