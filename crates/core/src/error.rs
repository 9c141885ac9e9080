// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for StreamPipe.
//!
//! All variants carry owned data and are `Clone`, because a captured
//! processor failure is stored in the stream's error slot and handed out to
//! every caller that asks for it afterwards.

use thiserror::Error;

/// Main error type for StreamPipe operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamPipeError {
    /// The stream graph was mutated while the stream was active.
    ///
    /// Attaching or detaching adapters is only legal when the stream is not
    /// in the `Active` state. This is a programming error; the offending
    /// call leaves the graph unchanged.
    #[error("cannot modify an active stream")]
    MutationWhileActive,

    /// A processor was attached with an order outside the accepted range.
    ///
    /// Valid orders are `0..=101`; `101` is reserved for the synchronized
    /// output terminal.
    #[error("processor order {0} out of range (0..=101)")]
    InvalidOrder(u32),

    /// Wiring the processor chain failed during `start`.
    ///
    /// The stream transitions to `Error` and the failure is returned to the
    /// `start` caller.
    #[error("stream setup failed: {0}")]
    Setup(String),

    /// A processor failed while handling a packet.
    ///
    /// The failure is captured in the stream's error slot and surfaced
    /// through the error signal; the stream transitions to `Error`.
    #[error("processor error: {0}")]
    Processor(String),

    /// A synchronized source failed to start.
    #[error("source error: {0}")]
    Source(String),

    /// The synchronized output queue is no longer accepting packets.
    #[error("synchronized output queue closed")]
    OutputClosed,
}

/// Convenience type alias for Results using [`StreamPipeError`].
pub type Result<T> = std::result::Result<T, StreamPipeError>;
