// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Mutable per-process runtime state.
//!
//! A [`ProcessRuntime`] pairs the immutable [`ProcessSpec`] with everything
//! the engine mutates while the process lives: burst progress, lifecycle
//! state, the timestamps the metrics are derived from, and the wait
//! accounting counters. Resetting a process for re-admission rebuilds this
//! record from the spec alone.

use crate::event::ProcState;
use schedsim_config::ProcessSpec;

/// Runtime record of one simulated process.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    /// The immutable descriptor this runtime was built from.
    pub spec: ProcessSpec,
    /// Current lifecycle state.
    pub state: ProcState,
    /// Index into `spec.bursts` of the burst in progress.
    pub burst_index: usize,
    /// Ticks left in the current burst. Never underflows.
    pub remaining: u64,
    /// Tick of the first dispatch, set once.
    pub first_start: Option<u64>,
    /// Tick of completion, set once.
    pub completion: Option<u64>,
    /// Remaining page-fault penalty ticks while in WAITING_MEM.
    pub mem_wait: u64,
    /// Accrued ticks spent in READY.
    pub ready_ticks: u64,
    /// Accrued ticks lost to page faults (the faulting tick plus the
    /// penalty countdown).
    pub mem_ticks: u64,
    /// Accrued ticks of I/O service received.
    pub io_served: u64,
    /// Whether the process was added interactively after initialization.
    pub user_added: bool,
}

impl ProcessRuntime {
    /// Builds a fresh runtime record for an admitted descriptor.
    #[must_use]
    pub fn new(spec: ProcessSpec, user_added: bool) -> Self {
        let first_burst = spec.bursts.first().copied().unwrap_or(0);
        ProcessRuntime {
            spec,
            state: ProcState::New,
            burst_index: 0,
            remaining: first_burst,
            first_start: None,
            completion: None,
            mem_wait: 0,
            ready_ticks: 0,
            mem_ticks: 0,
            io_served: 0,
            user_added,
        }
    }

    /// Rewinds the runtime to its pre-admission state, keeping the spec.
    pub fn rewind(&mut self) {
        let user_added = self.user_added;
        *self = ProcessRuntime::new(self.spec.clone(), user_added);
    }

    /// Returns `true` when the burst in progress is a CPU burst.
    #[must_use]
    pub fn on_cpu_burst(&self) -> bool {
        self.burst_index.is_multiple_of(2)
    }

    /// Returns `true` when the current burst is the final (CPU) burst.
    #[must_use]
    pub fn on_last_burst(&self) -> bool {
        self.burst_index + 1 == self.spec.bursts.len()
    }

    /// Advances to the next burst and loads its length into `remaining`.
    ///
    /// Callers must have checked [`ProcessRuntime::on_last_burst`] first;
    /// advancing past the end leaves `remaining` at zero.
    pub fn begin_next_burst(&mut self) {
        self.burst_index += 1;
        self.remaining = self.spec.bursts.get(self.burst_index).copied().unwrap_or(0);
    }
}
