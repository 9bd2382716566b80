// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Enumerations describing the scheduling policy, the page-replacement policy,
//! the memory mode and the per-process classification attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU scheduling policy driving the dispatch decision of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedPolicy {
    /// First-come first-served: a single FIFO ready queue, no preemption.
    Fcfs,
    /// Shortest job first: picks the shortest next CPU burst, no preemption.
    Sjf,
    /// Non-preemptive priority: picks by (priority, arrival, pid).
    PriorityNp,
    /// Preemptive priority: as [`SchedPolicy::PriorityNp`], but a strictly
    /// more urgent arrival takes the CPU from the runner.
    PriorityP,
    /// Round-robin over a single FIFO with a fixed time quantum.
    Rr,
    /// Two-level queue: a SYS FIFO that strictly dominates a USER FIFO,
    /// with round-robin time slicing inside each queue.
    Mlq,
}

impl SchedPolicy {
    /// All policies the live simulator supports, in a stable order.
    pub const ALL: [SchedPolicy; 6] = [
        SchedPolicy::Fcfs,
        SchedPolicy::Sjf,
        SchedPolicy::PriorityNp,
        SchedPolicy::PriorityP,
        SchedPolicy::Rr,
        SchedPolicy::Mlq,
    ];

    /// Returns `true` if the policy may take the CPU away from a running
    /// process before its burst completes.
    #[must_use]
    pub const fn is_preemptive(&self) -> bool {
        matches!(
            self,
            SchedPolicy::PriorityP | SchedPolicy::Rr | SchedPolicy::Mlq
        )
    }

    /// Returns `true` if the policy requires a time quantum to be configured.
    #[must_use]
    pub const fn uses_quantum(&self) -> bool {
        matches!(self, SchedPolicy::Rr | SchedPolicy::Mlq)
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SchedPolicy::Fcfs => "FCFS",
            SchedPolicy::Sjf => "SJF",
            SchedPolicy::PriorityNp => "PRIORITY_NP",
            SchedPolicy::PriorityP => "PRIORITY_P",
            SchedPolicy::Rr => "RR",
            SchedPolicy::Mlq => "MLQ",
        };
        write!(f, "{label}")
    }
}

/// Page-replacement policy used by the paged-memory subsystem to select a
/// victim frame on a page fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplacementPolicy {
    /// Evicts the frame with the oldest load tick.
    Fifo,
    /// Evicts the least recently used frame; ties fall to the smallest PFN.
    Lru,
    /// Evicts the least frequently used frame; ties fall to the least
    /// recently used, then the smallest PFN.
    Lfu,
    /// Second-chance clock: a circular pointer skips (and clears) frames
    /// whose reference bit is set.
    Clock,
    /// Belady's optimal policy. Requires the full future reference string
    /// and is therefore rejected by the live simulator at configure time.
    Opt,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReplacementPolicy::Fifo => "FIFO",
            ReplacementPolicy::Lru => "LRU",
            ReplacementPolicy::Lfu => "LFU",
            ReplacementPolicy::Clock => "CLOCK",
            ReplacementPolicy::Opt => "OPT",
        };
        write!(f, "{label}")
    }
}

/// Whether the simulator models virtual memory at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// CPU bursts execute without memory references.
    #[default]
    CpuOnly,
    /// Every CPU tick issues virtual-address references through the page
    /// table, and faults park the runner.
    Full,
}

/// Queue classification of a process, used by the two-level queue policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueClass {
    /// System-class processes; strictly dominate user-class ones under MLQ.
    Sys,
    /// User-class processes.
    #[default]
    User,
}

/// Deterministic virtual-address reference pattern of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefPattern {
    /// Walks the working set in order, wrapping at the end.
    #[default]
    Seq,
    /// Walks a short prefix of the working set with a small period.
    Loop,
    /// Picks working-set pages through a seeded PRNG.
    Rand,
    /// Cycles through an explicit user-supplied address list.
    Custom,
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;

    #[test]
    fn policy_wire_names() {
        let json = serde_json::to_string(&SchedPolicy::PriorityNp).unwrap();
        assert_eq!(json, "\"PRIORITY_NP\"");
        let parsed: SchedPolicy = serde_json::from_str("\"RR\"").unwrap();
        assert_eq!(parsed, SchedPolicy::Rr);
    }

    #[test]
    fn quantum_and_preemption_flags() {
        assert!(SchedPolicy::Rr.uses_quantum());
        assert!(SchedPolicy::Mlq.uses_quantum());
        assert!(!SchedPolicy::Fcfs.uses_quantum());
        assert!(SchedPolicy::PriorityP.is_preemptive());
        assert!(!SchedPolicy::PriorityNp.is_preemptive());
    }

    #[test]
    fn memory_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&MemoryMode::CpuOnly).unwrap(),
            "\"cpu_only\""
        );
        assert_eq!(serde_json::to_string(&MemoryMode::Full).unwrap(), "\"full\"");
    }
}
