// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! StreamPipe Core - Fundamental traits and data structures for in-process
//! packet pipelines.
//!
//! This crate defines the building blocks the engine routes:
//!
//! ## Core Modules
//!
//! - [`packet`]: the [`Packet`] contract, flag bits, and [`RawPacket`]
//! - [`signal`]: multicast emitters ([`PacketSignal`], [`Signal`])
//! - [`adapter`]: the [`Adapter`] / [`Processor`] / [`Startable`] contracts
//! - [`state`]: the stream lifecycle state machine
//! - [`error`]: error types and the crate [`Result`] alias
//!
//! ## Quick Start
//!
//! ```
//! use streampipe_core::{Adapter, PacketSignal, Processor, RawPacket, Result};
//!
//! /// A processor that upper-cases every payload byte.
//! struct Shout {
//!     emitter: PacketSignal,
//! }
//!
//! impl Adapter for Shout {
//!     fn emitter(&self) -> &PacketSignal {
//!         &self.emitter
//!     }
//! }
//!
//! impl Processor for Shout {
//!     fn process(&self, packet: &mut dyn streampipe_core::Packet) -> Result<()> {
//!         let loud: Vec<u8> = packet.payload().iter().map(u8::to_ascii_uppercase).collect();
//!         let mut out = RawPacket::new(loud);
//!         self.emitter.emit(&mut out)
//!     }
//! }
//! ```

pub mod adapter;
pub mod error;
pub mod packet;
pub mod signal;
pub mod state;

// Convenience re-exports for the types every adapter implementation needs.
pub use adapter::{Adapter, Processor, SignalAdapter, Startable, StartableSource};
pub use error::{Result, StreamPipeError};
pub use packet::{Packet, PacketFlags, RawPacket};
pub use signal::{PacketSignal, Signal, SlotId};
pub use state::{StateTransition, StreamState};
