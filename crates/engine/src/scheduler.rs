// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The tick state machine.
//!
//! [`Scheduler::tick`] advances logical time by exactly one unit through a
//! fixed sequence of sub-phases:
//!
//! 1. admit due arrivals (ordered by arrival tick, then pid),
//! 2. count down and release memory waiters,
//! 3. advance the I/O device and re-admit the released process,
//! 4. preemption check (strict priority, SYS domination, quantum expiry),
//! 5. dispatch when the CPU is free,
//! 6. execute one CPU tick, issuing memory references in full mode,
//! 7. post-execute transitions (I/O hand-off, completion),
//! 8. advance time and emit the I/O and memory timeline tokens.
//!
//! A quantum that expired at the end of tick `t` rotates the runner during
//! phase 4 of tick `t+1`, after that tick's admissions have joined the
//! queue; the expired runner keeps the CPU (quantum re-armed) when nobody
//! else is ready. Preemption is strict: tie-breaks never take the CPU away.

use crate::error::Error;
use crate::event::{ProcState, TransitionEvent};
use crate::iodev::IoDevice;
use crate::memory::MemoryManager;
use crate::metrics::{self, IDLE_TOKEN};
use crate::process::ProcessRuntime;
use crate::ready::ReadyQueue;
use crate::snapshot::{FrameView, MemorySnapshot, PageView, ProcessView, StateSnapshot};
use schedsim_config::{MemoryMode, ProcessSpec, QueueClass, SchedPolicy, SimConfig};
use std::collections::BTreeMap;
use tracing::debug;

/// The simulator core. Owns every piece of mutable simulation state.
#[derive(Debug)]
pub struct Scheduler {
    cfg: SimConfig,
    initialized: bool,
    time: u64,
    procs: BTreeMap<String, ProcessRuntime>,
    ready: ReadyQueue,
    running: Option<String>,
    quantum_left: u64,
    io: IoDevice,
    memory: MemoryManager,
    gantt: Vec<String>,
    io_gantt: Vec<String>,
    mem_gantt: Vec<String>,
    completed: Vec<String>,
    events: Vec<TransitionEvent>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an unconfigured scheduler. Ticking it returns
    /// [`Error::NotInitialized`] until [`Scheduler::configure`] succeeds.
    #[must_use]
    pub fn new() -> Self {
        let cfg = SimConfig::default();
        Scheduler {
            initialized: false,
            time: 0,
            procs: BTreeMap::new(),
            ready: ReadyQueue::for_policy(cfg.policy),
            running: None,
            quantum_left: 0,
            io: IoDevice::new(),
            memory: MemoryManager::new(&cfg),
            gantt: Vec::new(),
            io_gantt: Vec::new(),
            mem_gantt: Vec::new(),
            completed: Vec::new(),
            events: Vec::new(),
            cfg,
        }
    }

    /// Applies a configuration atomically.
    ///
    /// A rejected configuration leaves the previous one (and all runtime
    /// state) untouched. Changing the policy restarts the simulation from
    /// tick zero; other changes preserve logical time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when validation fails.
    pub fn configure(&mut self, cfg: SimConfig) -> Result<(), Error> {
        cfg.validate().map_err(Error::Config)?;
        let policy_changed = !self.initialized || self.cfg.policy != cfg.policy;
        let memory_changed = self.cfg.memory_mode != cfg.memory_mode
            || self.cfg.page_size != cfg.page_size
            || self.cfg.frame_count != cfg.frame_count
            || self.cfg.replacement != cfg.replacement;
        self.cfg = cfg;
        self.initialized = true;
        if policy_changed {
            self.restart();
        } else {
            if memory_changed {
                self.memory = MemoryManager::new(&self.cfg);
                self.register_memory_specs();
            }
            if self.cfg.policy.uses_quantum() {
                self.quantum_left = self.cfg.quantum.unwrap_or(1);
            }
        }
        debug!(policy = %self.cfg.policy, restarted = policy_changed, "configured");
        Ok(())
    }

    /// Re-arms the quantum without touching the rest of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the quantum is invalid for the active
    /// policy.
    pub fn set_quantum(&mut self, quantum: u64) -> Result<(), Error> {
        let cfg = SimConfig {
            quantum: Some(quantum),
            ..self.cfg.clone()
        };
        cfg.validate().map_err(Error::Config)?;
        self.cfg = cfg;
        if self.cfg.policy.uses_quantum() {
            self.quantum_left = quantum;
        }
        Ok(())
    }

    /// Adds a process to the pending arrivals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid descriptor and
    /// [`Error::DuplicatePid`] when the pid is taken.
    pub fn add_process(&mut self, spec: ProcessSpec, user_added: bool) -> Result<(), Error> {
        spec.validate().map_err(Error::Config)?;
        if self.procs.contains_key(&spec.pid) {
            return Err(Error::DuplicatePid { pid: spec.pid });
        }
        if let Some(mem) = &spec.memory {
            self.memory.register(&spec.pid, mem);
        }
        debug!(pid = %spec.pid, arrival = spec.arrival, "process added");
        let _ = self
            .procs
            .insert(spec.pid.clone(), ProcessRuntime::new(spec, user_added));
        Ok(())
    }

    /// Removes a process, then restarts the simulation from tick zero,
    /// re-admitting the remaining processes from their original arrivals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPid`] when no such process exists.
    pub fn remove_process(&mut self, pid: &str) -> Result<(), Error> {
        if self.procs.remove(pid).is_none() {
            return Err(Error::UnknownPid {
                pid: pid.to_owned(),
            });
        }
        self.restart();
        Ok(())
    }

    /// Drops every interactively added process and restarts from tick zero.
    pub fn clear_user_added(&mut self) {
        self.procs.retain(|_, p| !p.user_added);
        self.restart();
    }

    /// Restores initial conditions: no processes, time zero, configuration
    /// kept.
    pub fn reset(&mut self) {
        self.procs.clear();
        self.restart();
    }

    /// Advances logical time by exactly one unit.
    ///
    /// Ticking a finished workload is a no-op: time does not advance, so
    /// the makespan stays pinned to the last completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before the first successful
    /// [`Scheduler::configure`].
    pub fn tick(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if self.is_complete() {
            return Ok(());
        }
        let now = self.time;

        self.admit_arrivals(now);
        self.release_memory_waiters(now);
        let io_token = self.advance_io(now);
        self.check_preemption(now);
        self.dispatch(now);
        let mem_token = self.execute(now);

        self.io_gantt
            .push(io_token.unwrap_or_else(|| IDLE_TOKEN.to_owned()));
        self.mem_gantt.push(mem_token);
        self.accrue_wait_ticks();
        self.time = now + 1;
        Ok(())
    }

    /// Returns `true` when every process has completed and nothing is
    /// pending admission.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.procs.is_empty() && self.procs.values().all(|p| p.state == ProcState::Done)
    }

    /// Current logical time.
    #[must_use]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Whether [`Scheduler::configure`] has succeeded at least once.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    /// Copies the complete observable state into a value snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let (metrics, per_process) = metrics::compute(&self.procs, &self.gantt);
        let (sys_queue, user_queue) = match self.ready.dual_pids() {
            Some((sys, user)) => (Some(sys), Some(user)),
            None => (None, None),
        };
        StateSnapshot {
            time: self.time,
            algorithm: self.cfg.policy,
            preemptive: self.cfg.policy.is_preemptive(),
            tick_ms: self.cfg.tick_ms,
            quantum: self.cfg.quantum,
            running: self.running.clone(),
            ready_queue: self.ready.pids_in_pick_order(&self.procs),
            sys_queue,
            user_queue,
            io_active: self.io.active_pid().map(str::to_owned),
            io_queue: self.io.waiting_pids(),
            gantt: self.gantt.clone(),
            io_gantt: self.io_gantt.clone(),
            mem_gantt: self.mem_gantt.clone(),
            completed: self.completed.clone(),
            metrics,
            per_process,
            processes: self.procs.values().map(process_view).collect(),
            event_log: self.events.iter().map(ToString::to_string).collect(),
            memory: self.memory_snapshot(),
            note: None,
        }
    }

    fn memory_snapshot(&self) -> MemorySnapshot {
        let frames = self
            .memory
            .frames()
            .iter()
            .enumerate()
            .map(|(pfn, f)| FrameView {
                pfn,
                pid: f.owner.as_ref().map(|o| o.pid.clone()),
                vpn: f.owner.as_ref().map(|o| o.vpn),
                loaded_at: f.loaded_at,
                last_used: f.last_used,
                frequency: f.frequency,
                referenced: f.referenced,
            })
            .collect();
        let page_tables = self
            .memory
            .page_tables()
            .iter()
            .map(|(pid, table)| {
                let rows = table
                    .iter()
                    .map(|(vpn, e)| PageView {
                        vpn: *vpn,
                        present: e.present,
                        pfn: e.pfn,
                        last_used: e.last_used,
                        frequency: e.frequency,
                        dirty: e.dirty,
                    })
                    .collect();
                (pid.clone(), rows)
            })
            .collect();
        MemorySnapshot {
            mode: self.cfg.memory_mode,
            algo: self.cfg.replacement,
            page_size: self.cfg.page_size,
            num_frames: self.cfg.frame_count,
            frames,
            fault_penalty: self.cfg.fault_penalty,
            faults: self.memory.faults(),
            hits: self.memory.hits(),
            hit_ratio: self.memory.hit_ratio(),
            page_tables,
            recent_steps: self.memory.recent_steps(),
            last_translation_log: self.memory.last_log().to_vec(),
            mem_gantt: self.mem_gantt.clone(),
        }
    }

    // ---- tick sub-phases ------------------------------------------------

    fn admit_arrivals(&mut self, now: u64) {
        let mut due: Vec<(u64, String)> = self
            .procs
            .values()
            .filter(|p| p.state == ProcState::New && p.spec.arrival <= now)
            .map(|p| (p.spec.arrival, p.spec.pid.clone()))
            .collect();
        due.sort();
        for (_, pid) in due {
            self.transition(now, &pid, ProcState::Ready, None);
            self.enqueue_ready(pid);
        }
    }

    fn release_memory_waiters(&mut self, now: u64) {
        let mut released = Vec::new();
        for (pid, proc) in self.procs.iter_mut() {
            if proc.state == ProcState::WaitingMem {
                proc.mem_wait = proc.mem_wait.saturating_sub(1);
                if proc.mem_wait == 0 {
                    released.push(pid.clone());
                }
            }
        }
        for pid in released {
            self.transition(now, &pid, ProcState::Ready, None);
            self.enqueue_ready(pid);
        }
    }

    fn advance_io(&mut self, now: u64) -> Option<String> {
        let adv = self.io.advance();
        if let Some(pid) = &adv.served {
            if let Some(proc) = self.procs.get_mut(pid) {
                proc.io_served += 1;
                proc.remaining = proc.remaining.saturating_sub(1);
            }
        }
        if let Some(pid) = adv.released {
            if let Some(proc) = self.procs.get_mut(&pid) {
                proc.begin_next_burst();
            }
            self.transition(now, &pid, ProcState::Ready, None);
            self.enqueue_ready(pid);
        }
        adv.served
    }

    fn check_preemption(&mut self, now: u64) {
        let Some(run_pid) = self.running.clone() else {
            return;
        };
        match self.cfg.policy {
            SchedPolicy::PriorityP => {
                let challenger = self
                    .ready
                    .peek_next(&self.procs)
                    .and_then(|pid| self.procs.get(pid))
                    .map(|p| p.spec.priority);
                let incumbent = self.procs.get(&run_pid).map(|p| p.spec.priority);
                if let (Some(best), Some(run)) = (challenger, incumbent) {
                    if best < run {
                        self.preempt(now, &run_pid, "preempt");
                    }
                }
            }
            SchedPolicy::Rr => {
                if self.quantum_left == 0 {
                    if self.ready.is_empty() {
                        self.quantum_left = self.cfg.quantum.unwrap_or(1);
                    } else {
                        self.preempt(now, &run_pid, "time slice");
                    }
                }
            }
            SchedPolicy::Mlq => {
                let run_class = self
                    .procs
                    .get(&run_pid)
                    .map_or(QueueClass::User, |p| p.spec.queue);
                if run_class == QueueClass::User && self.ready.has_sys() {
                    self.preempt(now, &run_pid, "preempt");
                } else if self.quantum_left == 0 {
                    let own_queue_busy = self.ready.dual_pids().is_some_and(|(sys, user)| {
                        match run_class {
                            QueueClass::Sys => !sys.is_empty(),
                            QueueClass::User => !user.is_empty(),
                        }
                    });
                    if own_queue_busy {
                        self.preempt(now, &run_pid, "time slice");
                    } else {
                        self.quantum_left = self.cfg.quantum.unwrap_or(1);
                    }
                }
            }
            SchedPolicy::Fcfs | SchedPolicy::Sjf | SchedPolicy::PriorityNp => {}
        }
    }

    fn preempt(&mut self, now: u64, pid: &str, reason: &'static str) {
        self.transition(now, pid, ProcState::Ready, Some(reason));
        self.enqueue_ready(pid.to_owned());
        self.running = None;
    }

    fn dispatch(&mut self, now: u64) {
        if self.running.is_some() {
            return;
        }
        let Some(pid) = self.ready.pop_next(&self.procs) else {
            return;
        };
        self.transition(now, &pid, ProcState::Running, None);
        if let Some(proc) = self.procs.get_mut(&pid) {
            if proc.first_start.is_none() {
                proc.first_start = Some(now);
            }
        }
        if self.cfg.policy.uses_quantum() {
            self.quantum_left = self.cfg.quantum.unwrap_or(1);
        }
        self.running = Some(pid);
    }

    fn execute(&mut self, now: u64) -> String {
        let Some(pid) = self.running.clone() else {
            self.gantt.push(IDLE_TOKEN.to_owned());
            return IDLE_TOKEN.to_owned();
        };
        // The tick is consumed by the attempt even when it faults.
        self.gantt.push(pid.clone());

        if self.cfg.memory_mode == MemoryMode::Full {
            if let Some(outcome) = self.memory.step(&pid, now) {
                if outcome.faulted {
                    let penalty = self.memory.fault_penalty_for(&pid, self.cfg.fault_penalty);
                    if let Some(proc) = self.procs.get_mut(&pid) {
                        proc.mem_wait = penalty;
                    }
                    self.transition(now, &pid, ProcState::WaitingMem, Some("page fault"));
                    self.running = None;
                    return format!("FAULT:{pid}");
                }
                if let Some(proc) = self.procs.get_mut(&pid) {
                    proc.remaining = proc.remaining.saturating_sub(1);
                }
                if self.cfg.policy.uses_quantum() {
                    self.quantum_left = self.quantum_left.saturating_sub(1);
                }
                self.post_execute(now, &pid);
                return format!("HIT:{pid}");
            }
        }

        if let Some(proc) = self.procs.get_mut(&pid) {
            proc.remaining = proc.remaining.saturating_sub(1);
        }
        if self.cfg.policy.uses_quantum() {
            self.quantum_left = self.quantum_left.saturating_sub(1);
        }
        self.post_execute(now, &pid);
        IDLE_TOKEN.to_owned()
    }

    fn post_execute(&mut self, now: u64, pid: &str) {
        let Some(proc) = self.procs.get(pid) else {
            return;
        };
        if proc.remaining > 0 {
            return;
        }
        if proc.on_last_burst() {
            if let Some(proc) = self.procs.get_mut(pid) {
                proc.completion = Some(now + 1);
            }
            self.transition(now, pid, ProcState::Done, None);
            self.completed.push(pid.to_owned());
            self.running = None;
        } else {
            let io_len = {
                match self.procs.get_mut(pid) {
                    Some(proc) => {
                        proc.begin_next_burst();
                        proc.remaining
                    }
                    None => return,
                }
            };
            self.transition(now, pid, ProcState::WaitingIo, None);
            self.io.enqueue(pid.to_owned(), io_len);
            self.running = None;
        }
    }

    fn accrue_wait_ticks(&mut self) {
        for proc in self.procs.values_mut() {
            match proc.state {
                ProcState::Ready => proc.ready_ticks += 1,
                ProcState::WaitingMem => proc.mem_ticks += 1,
                _ => {}
            }
        }
    }

    // ---- helpers --------------------------------------------------------

    fn enqueue_ready(&mut self, pid: String) {
        let class = self
            .procs
            .get(&pid)
            .map_or(QueueClass::User, |p| p.spec.queue);
        self.ready.push(pid, class);
    }

    fn transition(&mut self, now: u64, pid: &str, to: ProcState, reason: Option<&'static str>) {
        let Some(proc) = self.procs.get_mut(pid) else {
            return;
        };
        let from = proc.state;
        proc.state = to;
        debug!(tick = now, pid, %from, %to, reason, "transition");
        self.events.push(TransitionEvent {
            tick: now,
            pid: pid.to_owned(),
            from,
            to,
            reason,
        });
    }

    fn register_memory_specs(&mut self) {
        for (pid, proc) in &self.procs {
            if let Some(mem) = &proc.spec.memory {
                self.memory.register(pid, mem);
            }
        }
    }

    fn restart(&mut self) {
        self.time = 0;
        self.running = None;
        self.quantum_left = 0;
        self.gantt.clear();
        self.io_gantt.clear();
        self.mem_gantt.clear();
        self.completed.clear();
        self.events.clear();
        self.io.clear();
        self.ready = ReadyQueue::for_policy(self.cfg.policy);
        self.memory = MemoryManager::new(&self.cfg);
        for proc in self.procs.values_mut() {
            proc.rewind();
        }
        self.register_memory_specs();
    }
}

fn process_view(proc: &ProcessRuntime) -> ProcessView {
    ProcessView {
        pid: proc.spec.pid.clone(),
        arrival: proc.spec.arrival,
        priority: proc.spec.priority,
        queue: proc.spec.queue,
        bursts: proc.spec.bursts.clone(),
        state: proc.state,
        burst_index: proc.burst_index,
        remaining: proc.remaining,
    }
}
