// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the scheduling engine.
//!
//! Only boundary operations can fail: configuration, process admission and
//! removal, and ticking an unconfigured engine. Everything that happens
//! inside a tick (page faults, I/O waits, preemptions) is a modeled outcome
//! recorded in the event log, never an error.

/// All errors that can occur in the scheduling engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for configuration and descriptor validation errors.
    #[error("configuration rejected: {0}")]
    Config(#[from] schedsim_config::Error),

    /// A process with the same pid already exists.
    #[error("a process with pid `{pid}` already exists")]
    DuplicatePid {
        /// The conflicting pid.
        pid: String,
    },

    /// The referenced process does not exist.
    #[error("no process with pid `{pid}`")]
    UnknownPid {
        /// The unknown pid.
        pid: String,
    },

    /// `tick` or `run` was called before the engine was configured.
    #[error("the simulator has not been initialized")]
    NotInitialized,
}
