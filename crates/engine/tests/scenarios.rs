// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scheduling scenarios with hand-verified timelines.

#![allow(missing_docs)]

use pretty_assertions::assert_eq;
use schedsim_config::{
    MemoryMode, MemorySpec, ProcessSpec, QueueClass, RefPattern, ReplacementPolicy, SchedPolicy,
    SimConfig,
};
use schedsim_engine::Scheduler;

fn spec(pid: &str, arrival: u64, bursts: &[u64]) -> ProcessSpec {
    ProcessSpec {
        pid: pid.to_owned(),
        arrival,
        priority: 0,
        queue: QueueClass::User,
        bursts: bursts.to_vec(),
        memory: None,
    }
}

fn sim_with(policy: SchedPolicy, quantum: Option<u64>, specs: Vec<ProcessSpec>) -> Scheduler {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy,
        quantum,
        ..SimConfig::default()
    })
    .expect("valid config");
    for s in specs {
        sim.add_process(s, false).expect("valid process");
    }
    sim
}

fn run_to_completion(sim: &mut Scheduler, budget: u64) {
    for _ in 0..budget {
        if sim.is_complete() {
            break;
        }
        sim.tick().expect("tick");
    }
    assert!(sim.is_complete(), "workload did not finish within budget");
}

fn gantt_prefix(sim: &Scheduler, n: usize) -> Vec<String> {
    sim.snapshot().gantt.into_iter().take(n).collect()
}

fn completion_of(sim: &Scheduler, pid: &str) -> u64 {
    sim.snapshot()
        .per_process
        .iter()
        .find(|p| p.pid == pid)
        .and_then(|p| p.completion)
        .expect("completed")
}

fn wait_of(sim: &Scheduler, pid: &str) -> u64 {
    sim.snapshot()
        .per_process
        .iter()
        .find(|p| p.pid == pid)
        .map(|p| p.wait)
        .expect("known pid")
}

#[test]
fn s1_fcfs_without_io() {
    let mut sim = sim_with(
        SchedPolicy::Fcfs,
        None,
        vec![
            spec("P1", 0, &[5]),
            spec("P2", 1, &[3]),
            spec("P3", 2, &[1]),
        ],
    );
    run_to_completion(&mut sim, 32);

    let expected: Vec<String> = ["P1", "P1", "P1", "P1", "P1", "P2", "P2", "P2", "P3"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    assert_eq!(gantt_prefix(&sim, 9), expected);

    assert_eq!(wait_of(&sim, "P1"), 0);
    assert_eq!(wait_of(&sim, "P2"), 4);
    assert_eq!(wait_of(&sim, "P3"), 6);

    // Turnarounds 5, 7, 7 against arrivals 0, 1, 2.
    assert_eq!(completion_of(&sim, "P1"), 5);
    assert_eq!(completion_of(&sim, "P2"), 8);
    assert_eq!(completion_of(&sim, "P3"), 9);
}

#[test]
fn s2_round_robin_quantum_two() {
    let mut sim = sim_with(
        SchedPolicy::Rr,
        Some(2),
        vec![
            spec("P1", 0, &[5]),
            spec("P2", 1, &[3]),
            spec("P3", 2, &[1]),
        ],
    );
    run_to_completion(&mut sim, 32);

    let expected: Vec<String> = ["P1", "P1", "P2", "P2", "P3", "P1", "P1", "P2", "P1"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    assert_eq!(gantt_prefix(&sim, 9), expected);

    assert_eq!(completion_of(&sim, "P3"), 5);
    assert_eq!(completion_of(&sim, "P2"), 8);
    assert_eq!(completion_of(&sim, "P1"), 9);
}

#[test]
fn s3_sjf_tie_breaks() {
    let mut sim = sim_with(
        SchedPolicy::Sjf,
        None,
        vec![
            spec("P1", 0, &[7]),
            spec("P2", 2, &[4]),
            spec("P3", 4, &[1]),
            spec("P4", 5, &[4]),
        ],
    );
    run_to_completion(&mut sim, 32);

    let gantt = sim.snapshot().gantt;
    // P1 runs to completion at 7, then the shortest burst (P3) wins, then
    // P2 beats P4 on arrival.
    assert_eq!(gantt[6], "P1");
    assert_eq!(gantt[7], "P3");
    assert_eq!(gantt[8], "P2");
    assert_eq!(gantt[12], "P4");
    assert_eq!(completion_of(&sim, "P3"), 8);
    assert_eq!(completion_of(&sim, "P2"), 12);
    assert_eq!(completion_of(&sim, "P4"), 16);
}

#[test]
fn s4_io_interleave_under_fcfs() {
    let mut sim = sim_with(
        SchedPolicy::Fcfs,
        None,
        vec![spec("P1", 0, &[3, 2, 2]), spec("P2", 0, &[2])],
    );
    run_to_completion(&mut sim, 32);

    let snap = sim.snapshot();
    let expected: Vec<String> = ["P1", "P1", "P1", "P2", "P2", "P1", "P1"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    assert_eq!(snap.gantt, expected);

    // The device serves P1 during ticks 3 and 4.
    assert_eq!(snap.io_gantt[3], "P1");
    assert_eq!(snap.io_gantt[4], "P1");
    assert!(snap.io_gantt.iter().filter(|t| *t == "P1").count() == 2);

    assert_eq!(completion_of(&sim, "P2"), 5);
    assert_eq!(completion_of(&sim, "P1"), 7);
    assert_eq!(wait_of(&sim, "P1"), 0);
    assert_eq!(wait_of(&sim, "P2"), 3);
}

#[test]
fn s5_page_faults_with_lru() {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy: SchedPolicy::Fcfs,
        memory_mode: MemoryMode::Full,
        frame_count: 2,
        replacement: ReplacementPolicy::Lru,
        page_size: 4096,
        fault_penalty: 2,
        ..SimConfig::default()
    })
    .expect("valid config");
    let mut p1 = spec("P1", 0, &[6]);
    p1.memory = Some(MemorySpec {
        vm_size: 4096 * 3,
        base: 0,
        working_set: 3,
        pages: Some(vec![0, 1, 2]),
        pattern: RefPattern::Seq,
        custom_addrs: Vec::new(),
        refs_per_tick: 1,
        fault_penalty: None,
        seed: 0,
    });
    sim.add_process(p1, false).expect("valid process");

    for _ in 0..6 {
        sim.tick().expect("tick");
    }
    let snap = sim.snapshot();

    // Each new VPN faults; the runner then sits out the two-tick penalty,
    // so attempts land on every other tick.
    assert_eq!(snap.gantt[0], "P1");
    assert_eq!(snap.gantt[1], "IDLE");
    assert_eq!(snap.gantt[2], "P1");
    assert_eq!(snap.gantt[3], "IDLE");
    assert_eq!(snap.gantt[4], "P1");
    assert_eq!(snap.mem_gantt[0], "FAULT:P1");
    assert_eq!(snap.mem_gantt[1], "IDLE");
    assert_eq!(snap.mem_gantt[2], "FAULT:P1");
    assert_eq!(snap.mem_gantt[4], "FAULT:P1");

    // The third fault (VPN 2) evicts the least recently used page, VPN 0.
    let faults: Vec<_> = snap
        .memory
        .recent_steps
        .iter()
        .filter(|r| r.fault)
        .collect();
    assert!(faults.len() >= 3);
    assert_eq!(faults[2].vpn, 2);
    assert_eq!(faults[2].evicted_vpn, Some(0));
    assert_eq!(faults[2].evicted_pid.as_deref(), Some("P1"));

    // The event log records the fault transition.
    assert!(
        snap.event_log
            .iter()
            .any(|l| l == "t=0: P1 RUNNING -> WAITING_MEM (page fault)")
    );
}

#[test]
fn s6_preemptive_priority() {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy: SchedPolicy::PriorityP,
        ..SimConfig::default()
    })
    .expect("valid config");
    let mut p1 = spec("P1", 0, &[8]);
    p1.priority = 5;
    let mut p2 = spec("P2", 3, &[4]);
    p2.priority = 1;
    sim.add_process(p1, false).expect("valid process");
    sim.add_process(p2, false).expect("valid process");
    run_to_completion(&mut sim, 32);

    let snap = sim.snapshot();
    assert_eq!(snap.gantt[2], "P1");
    assert_eq!(snap.gantt[3], "P2");
    assert_eq!(snap.gantt[6], "P2");
    assert_eq!(snap.gantt[7], "P1");
    assert_eq!(completion_of(&sim, "P2"), 7);
    assert_eq!(completion_of(&sim, "P1"), 12);
    assert!(
        snap.event_log
            .iter()
            .any(|l| l == "t=3: P1 RUNNING -> READY (preempt)")
    );
}

#[test]
fn priority_ties_do_not_preempt() {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy: SchedPolicy::PriorityP,
        ..SimConfig::default()
    })
    .expect("valid config");
    let mut p1 = spec("P1", 0, &[4]);
    p1.priority = 2;
    let mut p2 = spec("P2", 1, &[4]);
    p2.priority = 2;
    sim.add_process(p1, false).expect("valid process");
    sim.add_process(p2, false).expect("valid process");
    run_to_completion(&mut sim, 32);

    let gantt = sim.snapshot().gantt;
    assert_eq!(&gantt[..4], &["P1", "P1", "P1", "P1"]);
    assert_eq!(&gantt[4..8], &["P2", "P2", "P2", "P2"]);
}

#[test]
fn mlq_sys_preempts_user_and_slices_within_queue() {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy: SchedPolicy::Mlq,
        quantum: Some(2),
        ..SimConfig::default()
    })
    .expect("valid config");
    let u1 = spec("U1", 0, &[5]);
    let mut s1 = spec("S1", 2, &[2]);
    s1.queue = QueueClass::Sys;
    sim.add_process(u1, false).expect("valid process");
    sim.add_process(s1, false).expect("valid process");
    run_to_completion(&mut sim, 32);

    let snap = sim.snapshot();
    let expected: Vec<String> = ["U1", "U1", "S1", "S1", "U1", "U1", "U1"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    assert_eq!(snap.gantt, expected);
    assert!(
        snap.event_log
            .iter()
            .any(|l| l == "t=2: U1 RUNNING -> READY (preempt)")
    );
}
