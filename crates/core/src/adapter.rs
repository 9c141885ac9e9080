// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Adapter contracts: the common shape of everything in a stream graph.
//!
//! - [`Adapter`]: anything that owns an outbound emitter
//! - [`Processor`]: an adapter that transforms packets mid-chain
//! - [`Startable`] / [`StartableSource`]: sources whose lifecycle the
//!   stream drives on start/stop
//! - [`SignalAdapter`]: thin adapter around an external packet signal

use crate::error::Result;
use crate::packet::{Packet, RawPacket};
use crate::signal::PacketSignal;
use crate::state::StreamState;
use bytes::Bytes;
use std::sync::Arc;

/// Common shape of anything participating in a stream graph.
///
/// An adapter owns exactly one outbound emitter. Sources emit originated
/// packets on it; processors emit their results on it; the engine wires
/// emitters together to form the chain.
pub trait Adapter: Send + Sync {
    /// The adapter's outbound packet signal.
    fn emitter(&self) -> &PacketSignal;

    /// Observe a stream state transition.
    ///
    /// Invoked in dispatch context, under the processing lock, so
    /// implementations do not need to consider packet races. Default no-op.
    fn on_stream_state_change(&self, _state: StreamState) {}
}

/// An adapter that transforms packets between source and subscribers.
pub trait Processor: Adapter {
    /// Whether this processor wants the given packet.
    ///
    /// Only consulted for the first processor of the chain; a rejected
    /// packet is proxied unchanged to subscribers.
    fn accepts(&self, _packet: &dyn Packet) -> bool {
        true
    }

    /// Consume one packet. Implementations emit zero, one, or more result
    /// packets on their emitter.
    fn process(&self, packet: &mut dyn Packet) -> Result<()>;
}

/// Start/stop capability for sources the stream drives.
pub trait Startable: Send + Sync {
    fn start(&self) -> Result<()>;
    fn stop(&self);
}

/// A source adapter whose lifecycle the stream can drive.
///
/// Blanket-implemented: implementing [`Adapter`] and [`Startable`] is
/// enough.
pub trait StartableSource: Adapter + Startable {}

impl<T: Adapter + Startable> StartableSource for T {}

/// A thin adapter that exposes an external, shared packet signal as a
/// stream source.
///
/// Used by `attach_source_signal`: the stream owns the wrapper, the caller
/// keeps the signal and pushes packets into it from wherever it likes.
pub struct SignalAdapter {
    emitter: Arc<PacketSignal>,
}

impl SignalAdapter {
    pub fn new(signal: Arc<PacketSignal>) -> Self {
        Self { emitter: signal }
    }

    /// The wrapped signal.
    pub fn signal(&self) -> &Arc<PacketSignal> {
        &self.emitter
    }

    /// Wrap `data` in a transient [`RawPacket`] and emit it.
    pub fn emit_bytes(&self, data: impl Into<Bytes>) -> Result<()> {
        let mut packet = RawPacket::new(data);
        self.emitter.emit(&mut packet)
    }

    /// Emit a string payload.
    pub fn emit_str(&self, data: &str) -> Result<()> {
        self.emit_bytes(Bytes::copy_from_slice(data.as_bytes()))
    }

    /// Emit an existing packet.
    pub fn emit_packet(&self, packet: &mut dyn Packet) -> Result<()> {
        self.emitter.emit(packet)
    }
}

impl Adapter for SignalAdapter {
    fn emitter(&self) -> &PacketSignal {
        &self.emitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn signal_adapter_emits_on_wrapped_signal() {
        let signal = Arc::new(PacketSignal::new());
        let adapter = SignalAdapter::new(signal.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.attach(move |packet| {
            sink.lock().push(packet.payload().to_vec());
            Ok(())
        });

        adapter.emit_str("hello").unwrap();
        adapter.emit_bytes(Bytes::from_static(b"raw")).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], b"hello");
        assert_eq!(seen[1], b"raw");
    }

    #[test]
    fn default_state_change_is_noop() {
        let adapter = SignalAdapter::new(Arc::new(PacketSignal::new()));
        adapter.on_stream_state_change(StreamState::Active);
    }
}
