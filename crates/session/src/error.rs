// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the session layer.

/// All errors that can occur while driving a session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for engine errors raised while handling a command.
    #[error("{0}")]
    Engine(#[from] schedsim_engine::Error),

    /// An inbound message could not be decoded.
    #[error("could not decode control message: {0}")]
    Decode(#[from] serde_json::Error),

    /// The session worker has shut down.
    #[error("the session worker is no longer running")]
    ChannelClosed,
}
