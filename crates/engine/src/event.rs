// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Process lifecycle states and the transition event log.
//!
//! The rendered event log is the single authority for replay
//! classification, so its line grammar is part of the wire contract:
//! `t=<n>: <pid> <FROM> -> <TO>` with an optional ` (<reason>)` suffix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcState {
    /// Constructed but not yet admitted.
    New,
    /// Waiting in the ready structure for the CPU.
    Ready,
    /// Holding the CPU. At most one process is in this state globally.
    Running,
    /// Enqueued at or being served by the I/O device.
    WaitingIo,
    /// Serving a page-fault penalty.
    WaitingMem,
    /// Finished its last CPU burst. Terminal.
    Done,
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcState::New => "NEW",
            ProcState::Ready => "READY",
            ProcState::Running => "RUNNING",
            ProcState::WaitingIo => "WAITING_IO",
            ProcState::WaitingMem => "WAITING_MEM",
            ProcState::Done => "DONE",
        };
        write!(f, "{label}")
    }
}

/// One recorded lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Tick at which the transition happened.
    pub tick: u64,
    /// Pid of the transitioning process.
    pub pid: String,
    /// State left.
    pub from: ProcState,
    /// State entered.
    pub to: ProcState,
    /// Optional cause ("time slice", "preempt", "page fault").
    pub reason: Option<&'static str>,
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}: {} {} -> {}", self.tick, self.pid, self.from, self.to)?;
        if let Some(reason) = self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}
