// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Ready-queue disciplines.
//!
//! Each scheduling policy maps onto one of three semantic containers: a
//! single FIFO (FCFS, RR), an ordered set picked by a deterministic key
//! tuple (SJF, PRIORITY), or two FIFOs where the SYS queue strictly
//! dominates the USER queue (MLQ). Selection keys always end on the pid so
//! every pick is total and reproducible.

use crate::process::ProcessRuntime;
use schedsim_config::{QueueClass, SchedPolicy};
use std::collections::{BTreeMap, VecDeque};

/// Key used by the ordered disciplines to select the next process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKey {
    /// Shortest next CPU burst, ties by arrival then pid (SJF).
    NextBurst,
    /// Most urgent priority, ties by arrival then pid (PRIORITY).
    Priority,
}

/// The ready structure of the active policy.
#[derive(Debug, Clone)]
pub enum ReadyQueue {
    /// Insertion-ordered queue; the head is always picked.
    Fifo(VecDeque<String>),
    /// Unordered set; the minimum of the pick key is selected.
    Ordered {
        /// Pids currently ready, in insertion order.
        pids: Vec<String>,
        /// The selection key of the policy.
        key: PickKey,
    },
    /// Two-level queue: SYS strictly dominates USER at every pick.
    Dual {
        /// System-class FIFO.
        sys: VecDeque<String>,
        /// User-class FIFO.
        user: VecDeque<String>,
    },
}

type ProcTable = BTreeMap<String, ProcessRuntime>;

impl ReadyQueue {
    /// Builds the empty ready structure matching `policy`.
    #[must_use]
    pub fn for_policy(policy: SchedPolicy) -> Self {
        match policy {
            SchedPolicy::Fcfs | SchedPolicy::Rr => ReadyQueue::Fifo(VecDeque::new()),
            SchedPolicy::Sjf => ReadyQueue::Ordered {
                pids: Vec::new(),
                key: PickKey::NextBurst,
            },
            SchedPolicy::PriorityNp | SchedPolicy::PriorityP => ReadyQueue::Ordered {
                pids: Vec::new(),
                key: PickKey::Priority,
            },
            SchedPolicy::Mlq => ReadyQueue::Dual {
                sys: VecDeque::new(),
                user: VecDeque::new(),
            },
        }
    }

    /// Inserts a ready process at the back of its queue.
    pub fn push(&mut self, pid: String, class: QueueClass) {
        match self {
            ReadyQueue::Fifo(q) => q.push_back(pid),
            ReadyQueue::Ordered { pids, .. } => pids.push(pid),
            ReadyQueue::Dual { sys, user } => match class {
                QueueClass::Sys => sys.push_back(pid),
                QueueClass::User => user.push_back(pid),
            },
        }
    }

    /// Removes a pid wherever it sits; returns whether it was present.
    pub fn remove(&mut self, pid: &str) -> bool {
        fn remove_from(q: &mut VecDeque<String>, pid: &str) -> bool {
            if let Some(pos) = q.iter().position(|p| p == pid) {
                let _ = q.remove(pos);
                true
            } else {
                false
            }
        }
        match self {
            ReadyQueue::Fifo(q) => remove_from(q, pid),
            ReadyQueue::Ordered { pids, .. } => {
                if let Some(pos) = pids.iter().position(|p| p == pid) {
                    let _ = pids.remove(pos);
                    true
                } else {
                    false
                }
            }
            ReadyQueue::Dual { sys, user } => remove_from(sys, pid) || remove_from(user, pid),
        }
    }

    /// Returns the pid the policy would dispatch next, without removing it.
    #[must_use]
    pub fn peek_next(&self, procs: &ProcTable) -> Option<&str> {
        match self {
            ReadyQueue::Fifo(q) => q.front().map(String::as_str),
            ReadyQueue::Ordered { pids, key } => pids
                .iter()
                .min_by_key(|pid| Self::key_of(procs, pid, *key))
                .map(String::as_str),
            ReadyQueue::Dual { sys, user } => {
                sys.front().or_else(|| user.front()).map(String::as_str)
            }
        }
    }

    /// Removes and returns the pid the policy dispatches next.
    pub fn pop_next(&mut self, procs: &ProcTable) -> Option<String> {
        match self {
            ReadyQueue::Fifo(q) => q.pop_front(),
            ReadyQueue::Ordered { pids, key } => {
                let key = *key;
                let pos = pids
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, pid)| Self::key_of(procs, pid, key))
                    .map(|(pos, _)| pos)?;
                Some(pids.remove(pos))
            }
            ReadyQueue::Dual { sys, user } => sys.pop_front().or_else(|| user.pop_front()),
        }
    }

    /// Returns `true` when no process is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ready processes across all queues.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ReadyQueue::Fifo(q) => q.len(),
            ReadyQueue::Ordered { pids, .. } => pids.len(),
            ReadyQueue::Dual { sys, user } => sys.len() + user.len(),
        }
    }

    /// Returns `true` when the SYS queue of a two-level structure is
    /// non-empty. Always `false` for the other disciplines.
    #[must_use]
    pub fn has_sys(&self) -> bool {
        matches!(self, ReadyQueue::Dual { sys, .. } if !sys.is_empty())
    }

    /// Ready pids in pick order (queue order for FIFOs, key order for the
    /// ordered disciplines, SYS before USER for the two-level queue).
    #[must_use]
    pub fn pids_in_pick_order(&self, procs: &ProcTable) -> Vec<String> {
        match self {
            ReadyQueue::Fifo(q) => q.iter().cloned().collect(),
            ReadyQueue::Ordered { pids, key } => {
                let mut sorted = pids.clone();
                sorted.sort_by_key(|pid| {
                    let (a, b, _) = Self::key_of(procs, pid, *key);
                    (a, b, pid.clone())
                });
                sorted
            }
            ReadyQueue::Dual { sys, user } => sys.iter().chain(user.iter()).cloned().collect(),
        }
    }

    /// The SYS and USER queues of a two-level structure, in queue order.
    #[must_use]
    pub fn dual_pids(&self) -> Option<(Vec<String>, Vec<String>)> {
        match self {
            ReadyQueue::Dual { sys, user } => Some((
                sys.iter().cloned().collect(),
                user.iter().cloned().collect(),
            )),
            _ => None,
        }
    }

    /// Removes every queued pid.
    pub fn clear(&mut self) {
        match self {
            ReadyQueue::Fifo(q) => q.clear(),
            ReadyQueue::Ordered { pids, .. } => pids.clear(),
            ReadyQueue::Dual { sys, user } => {
                sys.clear();
                user.clear();
            }
        }
    }

    fn key_of<'a>(procs: &ProcTable, pid: &'a str, key: PickKey) -> (u64, u64, &'a str) {
        let Some(proc) = procs.get(pid) else {
            return (u64::MAX, u64::MAX, pid);
        };
        match key {
            // A ready process always sits at the start of a CPU burst, so
            // `remaining` is exactly its next CPU burst length.
            PickKey::NextBurst => (proc.remaining, proc.spec.arrival, pid),
            PickKey::Priority => (u64::from(proc.spec.priority), proc.spec.arrival, pid),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_config::ProcessSpec;

    fn table(entries: &[(&str, u64, u32, u64)]) -> ProcTable {
        entries
            .iter()
            .map(|&(pid, arrival, priority, burst)| {
                let spec = ProcessSpec {
                    pid: pid.to_owned(),
                    arrival,
                    priority,
                    queue: QueueClass::User,
                    bursts: vec![burst],
                    memory: None,
                };
                (pid.to_owned(), ProcessRuntime::new(spec, false))
            })
            .collect()
    }

    #[test]
    fn fifo_preserves_insertion_order() {
        let procs = table(&[("P1", 0, 0, 5), ("P2", 1, 0, 3)]);
        let mut q = ReadyQueue::for_policy(SchedPolicy::Fcfs);
        q.push("P1".to_owned(), QueueClass::User);
        q.push("P2".to_owned(), QueueClass::User);
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P1"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P2"));
    }

    #[test]
    fn sjf_picks_shortest_then_arrival_then_pid() {
        // Matches the SJF tie-break scenario: P3 has the shortest burst,
        // then P2 beats P4 on arrival.
        let procs = table(&[("P2", 2, 0, 4), ("P3", 4, 0, 1), ("P4", 5, 0, 4)]);
        let mut q = ReadyQueue::for_policy(SchedPolicy::Sjf);
        for pid in ["P2", "P3", "P4"] {
            q.push(pid.to_owned(), QueueClass::User);
        }
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P3"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P2"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P4"));
    }

    #[test]
    fn priority_orders_by_urgency() {
        let procs = table(&[("A", 0, 5, 4), ("B", 1, 1, 4), ("C", 0, 1, 4)]);
        let mut q = ReadyQueue::for_policy(SchedPolicy::PriorityNp);
        for pid in ["A", "B", "C"] {
            q.push(pid.to_owned(), QueueClass::User);
        }
        // Priority 1 first; C arrived before B.
        assert_eq!(q.pop_next(&procs).as_deref(), Some("C"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("B"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("A"));
    }

    #[test]
    fn mlq_sys_dominates_user() {
        let mut procs = table(&[("U1", 0, 0, 4), ("S1", 3, 0, 4)]);
        if let Some(p) = procs.get_mut("S1") {
            p.spec.queue = QueueClass::Sys;
        }
        let mut q = ReadyQueue::for_policy(SchedPolicy::Mlq);
        q.push("U1".to_owned(), QueueClass::User);
        assert!(!q.has_sys());
        q.push("S1".to_owned(), QueueClass::Sys);
        assert!(q.has_sys());
        assert_eq!(q.pop_next(&procs).as_deref(), Some("S1"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("U1"));
    }

    #[test]
    fn remove_drops_from_any_queue() {
        let procs = table(&[("P1", 0, 0, 5), ("P2", 0, 0, 5)]);
        let mut q = ReadyQueue::for_policy(SchedPolicy::Rr);
        q.push("P1".to_owned(), QueueClass::User);
        q.push("P2".to_owned(), QueueClass::User);
        assert!(q.remove("P1"));
        assert!(!q.remove("P1"));
        assert_eq!(q.pop_next(&procs).as_deref(), Some("P2"));
    }
}
