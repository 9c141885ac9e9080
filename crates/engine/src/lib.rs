// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! streampipe-engine: the packet stream engine.
//!
//! This crate routes discrete packets from one or more sources, through an
//! ordered chain of zero or more processors, to a set of subscribers, with
//! a deterministic lifecycle and an optional bridge that marshals output
//! onto a tokio runtime.
//!
//! ## Modules
//!
//! - [`stream`]: the [`Stream`] façade applications hold
//! - [`base`]: the internal [`StreamCore`] engine
//! - [`reference`]: adapter registration records and ordering
//! - [`sync_output`]: the [`SyncQueue`] output bridge
//! - [`constants`]: processor ordering constants
//!
//! ## Data flow
//!
//! A source emits a packet into dispatch. While the stream is active and
//! the packet is modifiable, the packet enters the first processor; the
//! processors are chained through their emitters so each feeds the next,
//! and the last one feeds the terminal emit, which forwards to the
//! stream's subscribers. With no processors, or when the first processor
//! rejects the packet, dispatch proxies the packet straight through.

pub mod base;
pub mod constants;
pub mod reference;
pub mod stream;
pub mod sync_output;

pub use base::StreamCore;
pub use constants::{APPEND_ORDER, MAX_PROCESSOR_ORDER, SYNC_OUTPUT_ORDER};
pub use reference::{ProcessorRef, SourceHandle, SourceRef};
pub use stream::Stream;
pub use sync_output::SyncQueue;

#[cfg(test)]
mod tests;
