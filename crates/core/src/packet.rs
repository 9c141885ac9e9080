// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The unit of transport that flows through a pipeline.
//!
//! This module defines:
//! - [`Packet`]: the abstract packet contract the engine routes
//! - [`PacketFlags`]: per-packet flag bits honoured during dispatch
//! - [`RawPacket`]: the default byte-buffer packet used by `write`
//!
//! The engine treats packets abstractly: it reads flags to decide routing
//! and clones packets when they cross threads, nothing more. Adapters that
//! exchange structured packets define their own [`Packet`] implementations
//! and downcast through [`Packet::as_any`] at the edges.

use bitflags::bitflags;
use bytes::Bytes;
use std::any::Any;

bitflags! {
    /// Flag bits carried by every packet.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u8 {
        /// The packet must not be touched by processors; dispatch routes it
        /// straight to the outbound emitter.
        const NO_MODIFY = 0b0000_0001;
    }
}

/// A discrete unit of media or data moving through the pipeline.
///
/// Packets are passed by reference through the processor chain; a processor
/// that wants to keep a packet beyond the current dispatch must
/// [`clone_packet`](Packet::clone_packet) it.
pub trait Packet: Send {
    /// The packet's byte payload.
    fn payload(&self) -> &[u8];

    /// Payload length in bytes.
    fn len(&self) -> usize {
        self.payload().len()
    }

    /// True when the payload is empty.
    fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }

    /// Flag bits honoured by dispatch.
    fn flags(&self) -> PacketFlags;

    /// Short type name for diagnostics and log output.
    fn class_name(&self) -> &'static str;

    /// Produce an independent copy of this packet.
    fn clone_packet(&self) -> Box<dyn Packet>;

    /// Concrete view for adapters that know the packet type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete view for adapters that know the packet type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A plain byte-buffer packet.
///
/// `Bytes`-backed so clones share the underlying buffer.
#[derive(Debug, Clone)]
pub struct RawPacket {
    payload: Bytes,
    flags: PacketFlags,
}

impl RawPacket {
    /// Create a packet with no flags set.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into(), flags: PacketFlags::empty() }
    }

    /// Create a packet with the given flags.
    pub fn with_flags(payload: impl Into<Bytes>, flags: PacketFlags) -> Self {
        Self { payload: payload.into(), flags }
    }

    /// Replace the payload in place.
    ///
    /// Processors transforming packets mid-chain use this instead of
    /// allocating a fresh packet per hop.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
    }

    /// The payload as shared bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.payload
    }
}

impl From<&str> for RawPacket {
    fn from(value: &str) -> Self {
        Self::new(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl Packet for RawPacket {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn flags(&self) -> PacketFlags {
        self.flags
    }

    fn class_name(&self) -> &'static str {
        "RawPacket"
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
