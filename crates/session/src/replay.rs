// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Replay projection over recorded timelines.
//!
//! Given a live snapshot and a requested logical time `t`, the projection
//! derives what the simulator looked like back then: the CPU and I/O
//! occupants come straight from the recorded timelines, the memory timeline
//! is truncated, and the event log is filtered by its parsed tick. Queue
//! contents cannot be reconstructed from the timelines alone, so a
//! projection at a past time carries an advisory note saying the queue
//! snapshots are latest-known only.

use schedsim_engine::StateSnapshot;

/// Timeline token for an idle tick.
const IDLE_TOKEN: &str = "IDLE";

/// Largest logical time a snapshot can be projected to.
#[must_use]
pub fn replay_max(state: &StateSnapshot) -> u64 {
    state
        .time
        .max(state.gantt.len().saturating_sub(1) as u64)
        .max(state.io_gantt.len().saturating_sub(1) as u64)
        .max(state.mem_gantt.len().saturating_sub(1) as u64)
}

/// Derives a past-state view of `state` at logical time `t`.
///
/// Requests beyond [`replay_max`] clamp to it.
#[must_use]
pub fn project(state: &StateSnapshot, t: u64) -> StateSnapshot {
    let t = t.min(replay_max(state));
    let mut view = state.clone();

    view.running = token_to_pid(state.gantt.get(t as usize));
    view.io_active = token_to_pid(state.io_gantt.get(t as usize));
    view.mem_gantt = state
        .mem_gantt
        .iter()
        .take(t as usize + 1)
        .cloned()
        .collect();
    view.memory.mem_gantt = view.mem_gantt.clone();
    view.event_log = state
        .event_log
        .iter()
        .filter(|line| parse_tick(line).is_some_and(|tick| tick <= t))
        .cloned()
        .collect();
    if t != state.time {
        view.note = Some(format!(
            "replay view at t={t} (live time {}): queue snapshots reflect the latest known state",
            state.time
        ));
    }
    view.time = t;
    view
}

fn token_to_pid(token: Option<&String>) -> Option<String> {
    match token {
        Some(token) if token != IDLE_TOKEN => Some(token.clone()),
        _ => None,
    }
}

fn parse_tick(line: &str) -> Option<u64> {
    let rest = line.strip_prefix("t=")?;
    let (tick, _) = rest.split_once(':')?;
    tick.parse().ok()
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_config::{ProcessSpec, QueueClass, SchedPolicy, SimConfig};
    use schedsim_engine::Scheduler;

    fn recorded_run() -> StateSnapshot {
        let mut sim = Scheduler::new();
        sim.configure(SimConfig {
            policy: SchedPolicy::Fcfs,
            ..SimConfig::default()
        })
        .expect("valid config");
        for (pid, arrival, bursts) in [("P1", 0u64, vec![3u64, 2, 2]), ("P2", 0, vec![2])] {
            sim.add_process(
                ProcessSpec {
                    pid: pid.to_owned(),
                    arrival,
                    priority: 0,
                    queue: QueueClass::User,
                    bursts,
                    memory: None,
                },
                false,
            )
            .expect("valid process");
        }
        for _ in 0..16 {
            sim.tick().expect("tick");
        }
        sim.snapshot()
    }

    #[test]
    fn round_trip_matches_recorded_tokens() {
        let state = recorded_run();
        for t in 0..=replay_max(&state) {
            let view = project(&state, t);
            let cpu = state.gantt.get(t as usize);
            let io = state.io_gantt.get(t as usize);
            assert_eq!(view.running, token_to_pid(cpu), "cpu token at t={t}");
            assert_eq!(view.io_active, token_to_pid(io), "io token at t={t}");
        }
    }

    #[test]
    fn truncates_memory_timeline_and_filters_events() {
        let state = recorded_run();
        let view = project(&state, 2);
        assert_eq!(view.mem_gantt.len(), 3);
        assert!(
            view.event_log
                .iter()
                .all(|line| parse_tick(line).is_some_and(|tick| tick <= 2))
        );
        // The live log has later events.
        assert!(
            state
                .event_log
                .iter()
                .any(|line| parse_tick(line).is_some_and(|tick| tick > 2))
        );
    }

    #[test]
    fn past_views_carry_a_note_and_live_views_do_not() {
        let state = recorded_run();
        let past = project(&state, 1);
        assert!(past.note.as_deref().is_some_and(|n| n.contains("t=1")));
        let live = project(&state, state.time);
        assert!(live.note.is_none());
    }

    #[test]
    fn requests_beyond_the_recording_clamp() {
        let state = recorded_run();
        let max = replay_max(&state);
        let view = project(&state, max + 50);
        assert_eq!(view.time, max);
    }
}
