// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-writer simulation session.
//!
//! A session owns one [`schedsim_engine::Scheduler`] on a dedicated worker
//! task. Inbound control messages are serialized through one mpsc channel
//! (the single-writer discipline), every mutating command produces exactly
//! one outbound snapshot, and snapshots fan out to subscribers through
//! latest-wins slots so a slow observer can never stall the simulation.
//! The worker suspends only at message receive; a tick never awaits.

/// The inbound control-message contract.
pub mod command;
/// Session errors.
pub mod error;
/// Latest-wins snapshot fan-out.
pub mod publisher;
/// Replay projection over recorded timelines.
pub mod replay;
/// The session worker and its handle.
pub mod session;

pub use command::{Command, ConfigArgs, InitArgs, parse_command};
pub use error::Error;
pub use publisher::Publisher;
pub use replay::{project, replay_max};
pub use session::{SessionHandle, WindowStats, spawn};
