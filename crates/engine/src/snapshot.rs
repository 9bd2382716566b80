// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Value-typed state snapshots.
//!
//! A [`StateSnapshot`] is the complete observable state of the simulator
//! after a tick, copied out of the engine into plain values. Its JSON shape
//! is the external wire contract: observers receive exactly this structure
//! and never share mutable references with the engine.

use crate::memory::TranslationRecord;
use crate::metrics::{Metrics, ProcessMetrics};
use crate::event::ProcState;
use schedsim_config::{MemoryMode, QueueClass, ReplacementPolicy, SchedPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete simulator state at one point in logical time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Current logical time.
    pub time: u64,
    /// Active scheduling policy.
    pub algorithm: SchedPolicy,
    /// Whether the active policy preempts.
    pub preemptive: bool,
    /// Pacing hint for observers, in milliseconds per tick.
    pub tick_ms: u64,
    /// Configured quantum, for the policies that use one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u64>,
    /// Pid currently holding the CPU.
    pub running: Option<String>,
    /// Ready pids in pick order.
    pub ready_queue: Vec<String>,
    /// SYS-class ready queue; present under MLQ only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_queue: Option<Vec<String>>,
    /// USER-class ready queue; present under MLQ only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_queue: Option<Vec<String>>,
    /// Pid currently at the I/O device.
    pub io_active: Option<String>,
    /// Pids waiting for the I/O device, in service order.
    pub io_queue: Vec<String>,
    /// CPU timeline: pid or "IDLE" per tick.
    pub gantt: Vec<String>,
    /// I/O timeline: served pid or "IDLE" per tick.
    pub io_gantt: Vec<String>,
    /// Memory timeline: "IDLE", "HIT:<pid>" or "FAULT:<pid>" per tick.
    pub mem_gantt: Vec<String>,
    /// Pids of completed processes, in completion order.
    pub completed: Vec<String>,
    /// Aggregate metrics, recomputed at serialization time.
    pub metrics: Metrics,
    /// Per-process metrics, one row per process.
    pub per_process: Vec<ProcessMetrics>,
    /// Full process roster with runtime progress.
    pub processes: Vec<ProcessView>,
    /// Rendered lifecycle transition log.
    pub event_log: Vec<String>,
    /// Memory subsystem state.
    pub memory: MemorySnapshot,
    /// Advisory note, set by derived views such as replay projections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One process as exposed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessView {
    /// Process identifier.
    pub pid: String,
    /// Arrival tick.
    pub arrival: u64,
    /// Scheduling priority; lower is more urgent.
    pub priority: u32,
    /// Queue classification.
    pub queue: QueueClass,
    /// The full burst sequence.
    pub bursts: Vec<u64>,
    /// Current lifecycle state.
    pub state: ProcState,
    /// Index of the burst in progress.
    pub burst_index: usize,
    /// Ticks left in the current burst.
    pub remaining: u64,
}

/// One frame of the global frame table as exposed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameView {
    /// Physical frame number.
    pub pfn: usize,
    /// Owning pid; `None` for a free frame.
    pub pid: Option<String>,
    /// Mapped VPN; `None` for a free frame.
    pub vpn: Option<u64>,
    /// Load tick of the current page.
    pub loaded_at: u64,
    /// Most recent access tick.
    pub last_used: u64,
    /// Accesses since load.
    pub frequency: u64,
    /// Second-chance reference bit.
    pub referenced: bool,
}

/// One page-table row as exposed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    /// Virtual page number.
    pub vpn: u64,
    /// Whether the page is resident.
    pub present: bool,
    /// Frame number when resident.
    pub pfn: Option<usize>,
    /// Most recent access tick.
    pub last_used: u64,
    /// Lifetime access count.
    pub frequency: u64,
    /// Write-back flag.
    pub dirty: bool,
}

/// Memory subsystem state as exposed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Active memory mode.
    pub mode: MemoryMode,
    /// Active replacement policy.
    pub algo: ReplacementPolicy,
    /// Global page size in bytes.
    pub page_size: u64,
    /// Number of physical frames.
    pub num_frames: usize,
    /// The frame table.
    pub frames: Vec<FrameView>,
    /// Global fault penalty in ticks.
    pub fault_penalty: u64,
    /// Lifetime fault count.
    pub faults: u64,
    /// Lifetime hit count.
    pub hits: u64,
    /// Hits over total references.
    pub hit_ratio: f64,
    /// Page-table rows keyed by pid.
    pub page_tables: BTreeMap<String, Vec<PageView>>,
    /// Most recent translation records, oldest first.
    pub recent_steps: Vec<TranslationRecord>,
    /// Rendered translation lines of the latest tick.
    pub last_translation_log: Vec<String>,
    /// Memory timeline, duplicated here for memory-focused observers.
    pub mem_gantt: Vec<String>,
}
