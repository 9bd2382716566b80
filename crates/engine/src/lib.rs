// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic tick-driven scheduling and paged-memory engine.
//!
//! The engine is a single-threaded logical state machine. One [`Scheduler`]
//! owns every piece of mutable simulation state: the process table, the
//! ready structure of the active policy, the I/O device, the paged-memory
//! subsystem and the three append-only timelines. Each call to
//! [`Scheduler::tick`] advances logical time by exactly one unit through a
//! fixed sequence of sub-phases (admissions, memory release, I/O advance,
//! preemption, dispatch, execute, post-execute), so identical inputs always
//! produce identical timelines.
//!
//! Observers never share mutable state with the engine:
//! [`Scheduler::snapshot`] copies primitives and container contents into a
//! value-typed [`snapshot::StateSnapshot`], which is also the external wire
//! contract.

/// Engine error types.
pub mod error;
/// Lifecycle states and transition events.
pub mod event;
/// Single-server FIFO I/O device.
pub mod iodev;
/// Paged virtual-memory subsystem.
pub mod memory;
/// Per-process and aggregate metrics.
pub mod metrics;
/// Mutable per-process runtime state.
pub mod process;
/// Ready-queue disciplines per scheduling policy.
pub mod ready;
/// The tick state machine.
pub mod scheduler;
/// Value-typed state snapshots (the wire contract).
pub mod snapshot;

pub use error::Error;
pub use event::{ProcState, TransitionEvent};
pub use scheduler::Scheduler;
pub use snapshot::StateSnapshot;
