// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration model for the scheduling simulator.
//!
//! This crate defines the declarative side of a simulation: which scheduling
//! policy runs, how the optional paged-memory subsystem is shaped, and the
//! immutable descriptors of the processes that make up a workload. All types
//! deserialize from the external control-message contract and are validated
//! at the configuration boundary, before any runtime state is touched.

/// Errors raised when a configuration or process descriptor is rejected.
pub mod error;
/// Scheduling, replacement and memory-mode enumerations.
pub mod policy;
/// Immutable process descriptors and their validation.
pub mod process;
/// Top-level simulation configuration.
pub mod sim;

pub use error::Error;
pub use policy::{MemoryMode, QueueClass, RefPattern, ReplacementPolicy, SchedPolicy};
pub use process::{MemorySpec, ProcessSpec};
pub use sim::SimConfig;
