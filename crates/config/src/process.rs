// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Immutable process descriptors.
//!
//! A [`ProcessSpec`] is the declarative half of a process: everything the
//! workload author states up front. The engine derives its own mutable
//! runtime record from it and never writes back into the descriptor, so a
//! spec can be re-admitted verbatim after a reset.

use crate::error::Error;
use crate::policy::{QueueClass, RefPattern};
use serde::{Deserialize, Serialize};

/// Immutable descriptor of a simulated process.
///
/// The burst sequence alternates CPU and I/O durations starting and ending
/// on CPU: `[c0, i0, c1, i1, ..., cn]`. It therefore always has odd length
/// and every entry is strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Unique, non-empty process identifier.
    pub pid: String,
    /// Logical tick at which the process becomes eligible for admission.
    #[serde(default)]
    pub arrival: u64,
    /// Scheduling priority; lower values are more urgent.
    #[serde(default)]
    pub priority: u32,
    /// Queue classification under the two-level queue policy.
    #[serde(default)]
    pub queue: QueueClass,
    /// Alternating CPU/IO burst durations, odd length, all strictly positive.
    pub bursts: Vec<u64>,
    /// Optional paged-memory behavior; absent processes issue no references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySpec>,
}

/// Paged-memory behavior of a process in full memory mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySpec {
    /// Virtual-memory size in bytes.
    pub vm_size: u64,
    /// Base virtual address of the process address space.
    #[serde(default)]
    pub base: u64,
    /// Number of working-set pages when `pages` is not given explicitly.
    #[serde(default = "default_working_set")]
    pub working_set: usize,
    /// Explicit working-set VPNs; overrides the generated working set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<u64>>,
    /// Deterministic reference pattern over the working set.
    #[serde(default)]
    pub pattern: RefPattern,
    /// Explicit virtual addresses for the CUSTOM pattern; cycled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_addrs: Vec<u64>,
    /// Memory references issued per CPU tick, in `1..=3`.
    #[serde(default = "default_refs_per_tick")]
    pub refs_per_tick: u32,
    /// Per-process fault penalty override in ticks; falls back to the
    /// globally configured penalty when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_penalty: Option<u64>,
    /// Seed for the RAND pattern's PRNG.
    #[serde(default)]
    pub seed: u64,
}

fn default_working_set() -> usize {
    4
}

fn default_refs_per_tick() -> u32 {
    1
}

impl ProcessSpec {
    /// Validates the descriptor against the data-model invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPid`], [`Error::InvalidBursts`] or
    /// [`Error::InvalidMemorySpec`] when the descriptor violates them.
    pub fn validate(&self) -> Result<(), Error> {
        if self.pid.is_empty() {
            return Err(Error::EmptyPid);
        }
        if self.bursts.is_empty() {
            return Err(Error::InvalidBursts {
                pid: self.pid.clone(),
                reason: "burst list is empty".to_owned(),
            });
        }
        if self.bursts.len().is_multiple_of(2) {
            return Err(Error::InvalidBursts {
                pid: self.pid.clone(),
                reason: "burst list must have odd length (alternating CPU/IO, ending on CPU)"
                    .to_owned(),
            });
        }
        if self.bursts.iter().any(|&b| b == 0) {
            return Err(Error::InvalidBursts {
                pid: self.pid.clone(),
                reason: "all bursts must be strictly positive".to_owned(),
            });
        }
        if let Some(mem) = &self.memory {
            mem.validate(&self.pid)?;
        }
        Ok(())
    }

    /// Sum of the CPU bursts (even indices).
    #[must_use]
    pub fn total_cpu(&self) -> u64 {
        self.bursts.iter().step_by(2).sum()
    }

    /// Sum of the I/O bursts (odd indices).
    #[must_use]
    pub fn total_io(&self) -> u64 {
        self.bursts.iter().skip(1).step_by(2).sum()
    }
}

impl MemorySpec {
    fn validate(&self, pid: &str) -> Result<(), Error> {
        let reject = |reason: &str| Error::InvalidMemorySpec {
            pid: pid.to_owned(),
            reason: reason.to_owned(),
        };
        if self.vm_size == 0 {
            return Err(reject("vm_size must be strictly positive"));
        }
        if !(1..=3).contains(&self.refs_per_tick) {
            return Err(reject("refs_per_tick must be between 1 and 3"));
        }
        if self.pages.as_ref().is_none_or(Vec::is_empty) && self.working_set == 0 {
            return Err(reject("working set must contain at least one page"));
        }
        if self.pattern == RefPattern::Custom && self.custom_addrs.is_empty() {
            return Err(reject("CUSTOM pattern requires a non-empty address list"));
        }
        Ok(())
    }
}
