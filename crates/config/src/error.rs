// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors raised at the configuration boundary.
//!
//! Every rejection leaves the simulator state untouched; the caller receives
//! one of these variants and may retry with a corrected configuration.

use crate::policy::{ReplacementPolicy, SchedPolicy};

/// All errors that can occur while validating a simulation configuration or
/// a process descriptor.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The selected policy requires a quantum but none was provided.
    #[error("policy {policy} requires a time quantum")]
    MissingQuantum {
        /// The policy that was being configured.
        policy: SchedPolicy,
    },

    /// The provided quantum is out of range for the selected policy.
    #[error("invalid quantum {quantum} for policy {policy}: must be >= 1")]
    InvalidQuantum {
        /// The policy that was being configured.
        policy: SchedPolicy,
        /// The rejected quantum value.
        quantum: u64,
    },

    /// The frame count is unusable for full memory mode.
    #[error("invalid frame count {frames}: full memory mode requires >= 1 frame")]
    InvalidFrameCount {
        /// The rejected frame count.
        frames: usize,
    },

    /// The page size is not a positive power of two.
    #[error("invalid page size {page_size}: must be a positive power of two")]
    InvalidPageSize {
        /// The rejected page size.
        page_size: u64,
    },

    /// The replacement policy cannot run in the live simulator.
    #[error("replacement policy {policy} is unsupported at runtime (requires the future reference string)")]
    UnsupportedReplacement {
        /// The rejected replacement policy.
        policy: ReplacementPolicy,
    },

    /// A process descriptor carried an empty pid.
    #[error("process pid must be a non-empty string")]
    EmptyPid,

    /// A process descriptor carried an unusable burst sequence.
    #[error("invalid bursts for process `{pid}`: {reason}")]
    InvalidBursts {
        /// Pid of the rejected process.
        pid: String,
        /// Why the burst sequence was rejected.
        reason: String,
    },

    /// A process descriptor carried an unusable memory specification.
    #[error("invalid memory spec for process `{pid}`: {reason}")]
    InvalidMemorySpec {
        /// Pid of the rejected process.
        pid: String,
        /// Why the memory specification was rejected.
        reason: String,
    },
}
