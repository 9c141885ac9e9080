// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Stream lifecycle states.
//!
//! ## State Machine
//!
//! ```text
//!       None ──→ Locked
//!        │          │
//!        └────┬─────┘
//!             ↓
//!          Active ←──────┐
//!           │  │         │
//!           │  ├→ Paused ┤ (resume)
//!           │  └→ Resetting
//!           ↓
//!        Stopping → Stopped
//!             │
//!             ↓
//!          Closed        Error ──(close)──→ Closed
//! ```
//!
//! Transitions are driven exclusively by the stream commands; adapters
//! observe each transition exactly once, in order, in dispatch context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a packet stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// Freshly created; the graph may be mutated freely.
    None,
    /// Frozen before start: no further mutation, not yet active.
    Locked,
    /// Packets flow through the processor chain.
    Active,
    /// Dispatch suspended; packets reaching the terminal emit are dropped.
    Paused,
    /// Transient state emitted while a reset is in progress.
    Resetting,
    /// Stop requested, sources are being wound down.
    Stopping,
    /// Sources stopped; the graph is intact and the stream can start again.
    Stopped,
    /// Terminal: the chain is torn down and the stream is quiescent.
    Closed,
    /// Terminal: a processor or setup failure was captured.
    Error,
}

impl StreamState {
    /// True for states in which the stream will never process another
    /// packet without external intervention.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Locked => "locked",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Resetting => "resetting",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Payload of the state-change signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// The state just entered.
    pub current: StreamState,
    /// The state just left.
    pub previous: StreamState,
}
