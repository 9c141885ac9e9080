// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The outward stream façade.
//!
//! [`Stream`] is what applications hold: lifecycle commands, attach/detach,
//! the write entry points, and the outbound signals. It owns exactly one
//! [`StreamCore`] and is destroyed with `close` + cleanup semantics, so a
//! dropped stream always leaves its adapters detached and stream-owned
//! adapters destroyed.

use crate::base::StreamCore;
use crate::reference::SourceRef;
use bytes::Bytes;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use streampipe_core::{
    Adapter, Packet, PacketSignal, Processor, RawPacket, Result, Signal, StartableSource,
    StateTransition, StreamPipeError, StreamState,
};

/// A packet stream: sources in, processors in order, subscribers out.
///
/// ```
/// use std::sync::Arc;
/// use streampipe_core::PacketSignal;
/// use streampipe_engine::Stream;
///
/// let stream = Stream::new("demo");
/// let source = Arc::new(PacketSignal::new());
/// stream.attach_source_signal(source.clone()).unwrap();
/// stream.emitter().attach(|packet| {
///     println!("{} bytes", packet.len());
///     Ok(())
/// });
/// stream.start().unwrap();
/// stream.write_bytes(&b"hello"[..]);
/// stream.close();
/// ```
pub struct Stream {
    core: Arc<StreamCore>,
    client_data: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
}

impl Stream {
    pub fn new(name: impl Into<String>) -> Self {
        Self { core: StreamCore::new(name.into()), client_data: Mutex::new(None) }
    }

    // --- Lifecycle ---

    /// Wire the processor chain, transition to `Active`, and start
    /// lifecycle-synchronized sources. Idempotent while active.
    pub fn start(&self) -> Result<()> {
        self.core.start()
    }

    /// Stop synchronized sources. Idempotent while stopped or closed.
    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn pause(&self) {
        self.core.pause();
    }

    /// Return to `Active`; ignored unless paused.
    pub fn resume(&self) {
        self.core.resume();
    }

    /// Emit `Resetting` then return to `Active`, so adapters can flush
    /// per-run state without the graph being torn down.
    pub fn reset(&self) {
        self.core.reset();
    }

    /// Drive the stream to `Closed` and tear down the chain. Idempotent
    /// and always safe to call.
    pub fn close(&self) {
        self.core.close();
    }

    /// Freeze a freshly created stream so the graph can no longer be
    /// mutated before `start`. Returns false unless the stream is still in
    /// its initial state.
    pub fn lock(&self) -> bool {
        self.core.lock()
    }

    // --- Queries ---

    pub fn state(&self) -> StreamState {
        self.core.state()
    }

    pub fn active(&self) -> bool {
        self.core.state_equals(StreamState::Active)
    }

    pub fn stopped(&self) -> bool {
        matches!(self.core.state(), StreamState::Stopping | StreamState::Stopped)
    }

    /// True for both `Closed` and `Error`: either way the stream will not
    /// process another packet.
    pub fn closed(&self) -> bool {
        self.core.state().is_terminal()
    }

    pub fn locked(&self) -> bool {
        self.core.state_equals(StreamState::Locked)
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// The captured failure after a processor or setup error.
    pub fn error(&self) -> Option<StreamPipeError> {
        self.core.error()
    }

    pub fn num_sources(&self) -> usize {
        self.core.num_sources()
    }

    pub fn num_processors(&self) -> usize {
        self.core.num_processors()
    }

    // --- Registration ---

    /// Attach a source adapter. With `owned`, the stream destroys the
    /// adapter during cleanup; otherwise the caller keeps ownership.
    pub fn attach_source(&self, adapter: Arc<dyn Adapter>, owned: bool) -> Result<()> {
        self.core.attach_source(SourceRef::passive(adapter, owned))
    }

    /// Attach a startable source. With `sync_state`, the stream invokes
    /// `start`/`stop` on it around its own lifecycle.
    pub fn attach_startable_source(
        &self,
        source: Arc<dyn StartableSource>,
        owned: bool,
        sync_state: bool,
    ) -> Result<()> {
        self.core.attach_source(SourceRef::startable(source, owned, sync_state))
    }

    /// Attach an external packet signal as a source. The stream owns the
    /// wrapping adapter; the caller keeps the signal.
    pub fn attach_source_signal(&self, signal: Arc<PacketSignal>) -> Result<()> {
        self.core.attach_source_signal(signal)
    }

    /// Detach a source by identity. Never destroys the adapter; ownership
    /// reverts to the caller.
    pub fn detach_source(&self, adapter: &dyn Adapter) -> Result<bool> {
        self.core.detach_source(adapter)
    }

    pub fn detach_source_signal(&self, signal: &PacketSignal) -> Result<bool> {
        self.core.detach_source_signal(signal)
    }

    /// Attach a processor at `order` (0 appends in registration order; 101
    /// is reserved for the synchronized output terminal).
    pub fn attach(&self, processor: Arc<dyn Processor>, order: u32, owned: bool) -> Result<()> {
        self.core.attach(processor, order, owned)
    }

    pub fn detach(&self, processor: &dyn Processor) -> Result<bool> {
        self.core.detach(processor)
    }

    // --- Input ---

    /// Dispatch a packet through the stream.
    pub fn write(&self, packet: &mut dyn Packet) {
        self.core.process(packet);
    }

    /// Wrap bytes in a transient [`RawPacket`] and dispatch it.
    pub fn write_bytes(&self, data: impl Into<Bytes>) {
        let mut packet = RawPacket::new(data);
        self.core.process(&mut packet);
    }

    // --- Output ---

    /// The outbound packet emitter subscribers attach to.
    pub fn emitter(&self) -> &PacketSignal {
        &self.core.emitter
    }

    /// Fired synchronously on every state transition.
    pub fn on_state_change(&self) -> &Signal<StateTransition> {
        &self.core.state_change
    }

    /// Fired once per lifecycle when the stream enters `Closed`.
    pub fn on_close(&self) -> &Signal<()> {
        &self.core.close_signal
    }

    /// Fired when a processor failure is captured.
    pub fn on_error(&self) -> &Signal<StreamPipeError> {
        &self.core.error_signal
    }

    /// Marshal emitted packets onto the given runtime's threads via a
    /// terminal [`SyncQueue`](crate::SyncQueue). Requires a non-active
    /// stream.
    pub fn synchronize_output(&self, handle: &tokio::runtime::Handle) -> Result<()> {
        self.core.synchronize_output(handle)
    }

    // --- Misc ---

    /// Auto-close the stream after a captured processor failure.
    pub fn close_on_error(&self, enabled: bool) {
        self.core.close_on_error(enabled);
    }

    pub fn set_client_data(&self, data: Arc<dyn Any + Send + Sync>) {
        *self.client_data.lock() = Some(data);
    }

    pub fn client_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.client_data.lock().clone()
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<StreamCore> {
        &self.core
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.core.close();
        self.core.cleanup();
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
