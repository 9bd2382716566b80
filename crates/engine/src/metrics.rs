// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-process and aggregate scheduling metrics.
//!
//! Metrics are never maintained incrementally; they are recomputed from the
//! CPU timeline and the per-process timestamps whenever a snapshot is
//! serialized, so they cannot drift from the state they describe.

use crate::event::ProcState;
use crate::process::ProcessRuntime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timeline token for an idle tick.
pub const IDLE_TOKEN: &str = "IDLE";

/// Aggregate metrics over one simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean ticks spent in READY across admitted processes.
    pub avg_wait: f64,
    /// Mean turnaround (completion - arrival) across completed processes.
    pub avg_turnaround: f64,
    /// Mean response (first start - arrival) across started processes.
    pub avg_response: f64,
    /// Busy CPU ticks over makespan, as a percentage.
    pub cpu_util: f64,
    /// Completion tick of the last-finishing process.
    pub makespan: u64,
    /// Completed processes per tick of makespan.
    pub throughput: f64,
}

/// Metrics of a single process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    /// Process identifier.
    pub pid: String,
    /// Arrival tick.
    pub arrival: u64,
    /// Current lifecycle state.
    pub state: ProcState,
    /// Ticks spent in READY so far.
    pub wait: u64,
    /// Completion - arrival, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnaround: Option<u64>,
    /// First start - arrival, once dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<u64>,
    /// Completion tick, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<u64>,
}

/// Computes aggregate and per-process metrics from the current state.
#[must_use]
pub fn compute(
    procs: &BTreeMap<String, ProcessRuntime>,
    gantt: &[String],
) -> (Metrics, Vec<ProcessMetrics>) {
    let mut per_process = Vec::with_capacity(procs.len());
    let mut wait_sum = 0u64;
    let mut admitted = 0u64;
    let mut tat_sum = 0u64;
    let mut completed = 0u64;
    let mut rt_sum = 0u64;
    let mut started = 0u64;
    let mut makespan = 0u64;

    for proc in procs.values() {
        let turnaround = proc.completion.map(|c| c - proc.spec.arrival);
        let response = proc.first_start.map(|s| s - proc.spec.arrival);
        if proc.state != ProcState::New {
            admitted += 1;
            wait_sum += proc.ready_ticks;
        }
        if let Some(tat) = turnaround {
            completed += 1;
            tat_sum += tat;
        }
        if let Some(rt) = response {
            started += 1;
            rt_sum += rt;
        }
        if let Some(c) = proc.completion {
            makespan = makespan.max(c);
        }
        per_process.push(ProcessMetrics {
            pid: proc.spec.pid.clone(),
            arrival: proc.spec.arrival,
            state: proc.state,
            wait: proc.ready_ticks,
            turnaround,
            response,
            completion: proc.completion,
        });
    }

    let busy = gantt
        .iter()
        .take(makespan as usize)
        .filter(|t| t.as_str() != IDLE_TOKEN)
        .count() as u64;

    let mean = |sum: u64, n: u64| if n == 0 { 0.0 } else { sum as f64 / n as f64 };
    let metrics = Metrics {
        avg_wait: mean(wait_sum, admitted),
        avg_turnaround: mean(tat_sum, completed),
        avg_response: mean(rt_sum, started),
        cpu_util: if makespan == 0 {
            0.0
        } else {
            busy as f64 / makespan as f64 * 100.0
        },
        makespan,
        throughput: if makespan == 0 {
            0.0
        } else {
            completed as f64 / makespan as f64
        },
    };
    (metrics, per_process)
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_config::{ProcessSpec, QueueClass};

    fn done_proc(pid: &str, arrival: u64, cpu: u64, first: u64, completion: u64, wait: u64) -> ProcessRuntime {
        let mut p = ProcessRuntime::new(
            ProcessSpec {
                pid: pid.to_owned(),
                arrival,
                priority: 0,
                queue: QueueClass::User,
                bursts: vec![cpu],
                memory: None,
            },
            false,
        );
        p.state = ProcState::Done;
        p.first_start = Some(first);
        p.completion = Some(completion);
        p.ready_ticks = wait;
        p
    }

    #[test]
    fn fcfs_reference_metrics() {
        // The FCFS no-IO scenario: waits {0, 4, 6}, turnarounds {5, 7, 7}.
        let mut procs = BTreeMap::new();
        let _ = procs.insert("P1".to_owned(), done_proc("P1", 0, 5, 0, 5, 0));
        let _ = procs.insert("P2".to_owned(), done_proc("P2", 1, 3, 5, 8, 4));
        let _ = procs.insert("P3".to_owned(), done_proc("P3", 2, 1, 8, 9, 6));
        let gantt: Vec<String> = ["P1"; 5]
            .iter()
            .chain(["P2"; 3].iter())
            .chain(["P3"; 1].iter())
            .map(|s| (*s).to_owned())
            .collect();

        let (m, per) = compute(&procs, &gantt);
        assert_eq!(m.makespan, 9);
        assert!((m.avg_wait - 10.0 / 3.0).abs() < 1e-9);
        assert!((m.avg_turnaround - 19.0 / 3.0).abs() < 1e-9);
        assert!((m.cpu_util - 100.0).abs() < 1e-9);
        assert!((m.throughput - 3.0 / 9.0).abs() < 1e-9);
        assert_eq!(per.len(), 3);
        assert_eq!(per[0].wait, 0);
        assert_eq!(per[1].turnaround, Some(7));
    }

    #[test]
    fn empty_state_yields_zeroes() {
        let (m, per) = compute(&BTreeMap::new(), &[]);
        assert_eq!(m, Metrics::default());
        assert!(per.is_empty());
    }
}
