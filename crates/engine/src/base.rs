// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The internal stream engine.
//!
//! [`StreamCore`] owns the adapter graph, the lifecycle state machine, and
//! the dispatch path. The public [`Stream`](crate::Stream) façade holds
//! exactly one `Arc<StreamCore>` and delegates to it.
//!
//! ## Locking
//!
//! Two locks with distinct jobs:
//!
//! - the **registration lock** guards the graph itself: adapter lists,
//!   current state, the pending-state queue, the captured error, and the
//!   wiring bookkeeping. Held only for short, non-blocking sections.
//! - the **processing lock** serializes dispatch across source threads and
//!   excludes lifecycle transitions from racing in-flight packets. `start`,
//!   `stop`, and `close` take it around source start/stop and teardown;
//!   dispatch takes it around "drain pending states + run the chain".
//!
//! Adapter callbacks never run under the registration lock.

use crate::constants::{APPEND_ORDER, MAX_PROCESSOR_ORDER, SYNC_OUTPUT_ORDER};
use crate::reference::{ProcessorRef, SourceHandle, SourceRef, adapter_ptr, processor_ptr};
use crate::sync_output::SyncQueue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use streampipe_core::{
    Adapter, Packet, PacketFlags, PacketSignal, Processor, Result, Signal, SignalAdapter,
    StateTransition, StreamPipeError, StreamState,
};

/// One emitter slot installed by `setup`, remembered so `teardown` can
/// detach exactly what was attached.
struct WiredSlot {
    owner: Arc<dyn Adapter>,
    id: streampipe_core::SlotId,
}

/// Everything guarded by the registration lock.
struct Graph {
    sources: Vec<SourceRef>,
    processors: Vec<ProcessorRef>,
    state: StreamState,
    pending: VecDeque<StreamState>,
    error: Option<StreamPipeError>,
    wired: Vec<WiredSlot>,
    close_emitted: bool,
}

/// The internal engine behind a [`Stream`](crate::Stream).
///
/// All methods are callable from any thread. Graph mutation requires a
/// non-`Active` state; dispatch and lifecycle commands are always safe.
pub struct StreamCore {
    name: String,
    graph: Mutex<Graph>,
    proc_lock: Mutex<()>,
    pub(crate) emitter: PacketSignal,
    pub(crate) state_change: Signal<StateTransition>,
    pub(crate) close_signal: Signal<()>,
    pub(crate) error_signal: Signal<StreamPipeError>,
    close_on_error: AtomicBool,
}

impl StreamCore {
    pub(crate) fn new(name: String) -> Arc<Self> {
        tracing::trace!(stream = %name, "creating stream core");
        Arc::new(Self {
            name,
            graph: Mutex::new(Graph {
                sources: Vec::new(),
                processors: Vec::new(),
                state: StreamState::None,
                pending: VecDeque::new(),
                error: None,
                wired: Vec::new(),
                close_emitted: false,
            }),
            proc_lock: Mutex::new(()),
            emitter: PacketSignal::new(),
            state_change: Signal::new(),
            close_signal: Signal::new(),
            error_signal: Signal::new(),
            close_on_error: AtomicBool::new(false),
        })
    }

    // --- State ---

    pub fn state(&self) -> StreamState {
        self.graph.lock().state
    }

    pub fn state_equals(&self, state: StreamState) -> bool {
        self.state() == state
    }

    /// True when `state` is still waiting in the pending-state queue,
    /// i.e. not yet observed by adapters.
    pub fn has_queued_state(&self, state: StreamState) -> bool {
        self.graph.lock().pending.contains(&state)
    }

    /// The sole state mutator: records the transition, queues it for
    /// adapters, and fires the state-change signal synchronously.
    fn set_state(&self, new: StreamState) {
        let previous = {
            let mut graph = self.graph.lock();
            let previous = graph.state;
            graph.state = new;
            graph.pending.push_back(new);
            previous
        };
        tracing::debug!(stream = %self.name, from = %previous, to = %new, "state change");
        self.state_change.emit(&StateTransition { current: new, previous });
    }

    // --- Lifecycle commands ---

    /// Freeze the graph before start. Only legal from the initial state.
    pub fn lock(&self) -> bool {
        if !self.state_equals(StreamState::None) {
            tracing::debug!(stream = %self.name, state = %self.state(), "lock ignored");
            return false;
        }
        self.set_state(StreamState::Locked);
        true
    }

    /// Wire the chain, go `Active`, and start synchronized sources.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.state_equals(StreamState::Active) {
            tracing::debug!(stream = %self.name, "start: already active");
            return Ok(());
        }
        tracing::debug!(stream = %self.name, "starting");

        if let Err(err) = self.setup() {
            self.graph.lock().error = Some(err.clone());
            self.set_state(StreamState::Error);
            return Err(err);
        }

        self.set_state(StreamState::Active);

        let started = {
            let _guard = self.proc_lock.lock();
            self.start_sources()
        };
        if let Err(err) = started {
            self.graph.lock().error = Some(err.clone());
            self.set_state(StreamState::Error);
            return Err(err);
        }
        Ok(())
    }

    /// Stop synchronized sources. The graph stays wired; `start` resumes.
    pub fn stop(&self) {
        if matches!(
            self.state(),
            StreamState::Stopped | StreamState::Stopping | StreamState::Closed
        ) {
            tracing::debug!(stream = %self.name, "stop: already stopped");
            return;
        }
        tracing::debug!(stream = %self.name, "stopping");
        self.set_state(StreamState::Stopping);
        self.set_state(StreamState::Stopped);

        let _guard = self.proc_lock.lock();
        self.stop_sources();
    }

    pub fn pause(&self) {
        tracing::debug!(stream = %self.name, "pausing");
        self.set_state(StreamState::Paused);
    }

    pub fn resume(&self) {
        if !self.state_equals(StreamState::Paused) {
            tracing::debug!(stream = %self.name, state = %self.state(), "resume: not paused");
            return;
        }
        self.set_state(StreamState::Active);
    }

    pub fn reset(&self) {
        tracing::debug!(stream = %self.name, "resetting");
        self.set_state(StreamState::Resetting);
        self.set_state(StreamState::Active);
    }

    /// Drive the stream to `Closed` and tear the graph down.
    ///
    /// Idempotent and always safe; the close signal fires at most once per
    /// lifecycle.
    pub fn close(&self) {
        if matches!(self.state(), StreamState::None | StreamState::Closed) {
            tracing::debug!(stream = %self.name, "close: already closed");
            return;
        }
        tracing::debug!(stream = %self.name, "closing");

        if !matches!(self.state(), StreamState::Stopped | StreamState::Stopping) {
            self.stop();
        }

        self.set_state(StreamState::Closed);

        {
            let _guard = self.proc_lock.lock();
            self.teardown();
            // Adapters observe every remaining state, Closed included. No
            // more packets arrive after teardown, so this is their last
            // notification; the output queue relies on it to cancel.
            self.drain_pending_states();
        }

        let first_close = {
            let mut graph = self.graph.lock();
            !std::mem::replace(&mut graph.close_emitted, true)
        };
        if first_close {
            self.close_signal.emit(&());
        }
        tracing::debug!(stream = %self.name, "closed");
    }

    /// Auto-close the stream after a captured processor failure.
    pub fn close_on_error(&self, enabled: bool) {
        self.close_on_error.store(enabled, Ordering::Release);
    }

    // --- Registration ---

    fn ensure_not_active(&self) -> Result<()> {
        if self.state_equals(StreamState::Active) {
            tracing::error!(stream = %self.name, "attempted to modify an active stream");
            return Err(StreamPipeError::MutationWhileActive);
        }
        Ok(())
    }

    /// Mutating a wired graph invalidates the chain; tear it down so the
    /// next `start` rebuilds it against the new adapter lists.
    fn unwire(&self) {
        if self.graph.lock().wired.is_empty() {
            return;
        }
        let _guard = self.proc_lock.lock();
        self.teardown();
    }

    pub fn attach_source(&self, source: SourceRef) -> Result<()> {
        self.ensure_not_active()?;
        self.unwire();
        let mut graph = self.graph.lock();
        let order = graph.sources.len() as u32;
        graph.sources.push(source.with_order(order));
        tracing::trace!(stream = %self.name, sources = graph.sources.len(), "source attached");
        Ok(())
    }

    /// Wrap an external signal in a stream-owned adapter and register it.
    pub fn attach_source_signal(&self, signal: Arc<PacketSignal>) -> Result<()> {
        self.ensure_not_active()?;
        self.attach_source(SourceRef::signal(Arc::new(SignalAdapter::new(signal))))
    }

    pub fn detach_source(&self, adapter: &dyn Adapter) -> Result<bool> {
        self.ensure_not_active()?;
        self.unwire();
        let mut graph = self.graph.lock();
        let target = adapter_ptr(adapter);
        let before = graph.sources.len();
        // Ownership reverts to the caller; the adapter is never destroyed
        // here even when it was registered as stream-owned.
        graph.sources.retain(|source| adapter_ptr(source.handle().as_adapter()) != target);
        let found = graph.sources.len() != before;
        if found {
            tracing::trace!(stream = %self.name, "source detached");
        }
        Ok(found)
    }

    pub fn detach_source_signal(&self, signal: &PacketSignal) -> Result<bool> {
        self.ensure_not_active()?;
        self.unwire();
        let mut graph = self.graph.lock();
        let before = graph.sources.len();
        graph.sources.retain(|source| match source.handle() {
            SourceHandle::Signal(wrapper) => !std::ptr::eq(wrapper.signal().as_ref(), signal),
            _ => true,
        });
        let found = graph.sources.len() != before;
        if found {
            tracing::trace!(stream = %self.name, "source signal detached");
        }
        Ok(found)
    }

    pub fn attach(&self, processor: Arc<dyn Processor>, order: u32, owned: bool) -> Result<()> {
        if order > MAX_PROCESSOR_ORDER {
            return Err(StreamPipeError::InvalidOrder(order));
        }
        self.ensure_not_active()?;
        self.unwire();
        let mut graph = self.graph.lock();
        let effective = if order == APPEND_ORDER { graph.processors.len() as u32 } else { order };
        graph.processors.push(ProcessorRef::new(processor, effective, owned));
        // Stable sort: equal orders keep their insertion order.
        graph.processors.sort_by_key(ProcessorRef::order);
        tracing::trace!(
            stream = %self.name,
            order = effective,
            processors = graph.processors.len(),
            "processor attached"
        );
        Ok(())
    }

    pub fn detach(&self, processor: &dyn Processor) -> Result<bool> {
        self.ensure_not_active()?;
        self.unwire();
        let mut graph = self.graph.lock();
        let target = processor_ptr(processor);
        let before = graph.processors.len();
        graph.processors.retain(|entry| processor_ptr(entry.processor().as_ref()) != target);
        let found = graph.processors.len() != before;
        if found {
            tracing::trace!(stream = %self.name, "processor detached");
        }
        Ok(found)
    }

    /// Install a [`SyncQueue`] as the terminal processor so emitted packets
    /// are handed to the given runtime's threads.
    pub fn synchronize_output(&self, handle: &tokio::runtime::Handle) -> Result<()> {
        self.ensure_not_active()?;
        let queue: Arc<dyn Processor> = SyncQueue::spawn(handle);
        self.attach(queue, SYNC_OUTPUT_ORDER, true)
    }

    // --- Wiring ---

    /// Wire the delegate chain: processors pairwise in ascending order, the
    /// last processor into the terminal emit, and every source into
    /// dispatch. Idempotent while wired.
    fn setup(self: &Arc<Self>) -> Result<()> {
        let (sources, processors) = {
            let graph = self.graph.lock();
            if !graph.wired.is_empty() {
                tracing::trace!(stream = %self.name, "setup: chain already wired");
                return Ok(());
            }
            let sources: Vec<Arc<dyn Adapter>> =
                graph.sources.iter().map(|s| s.handle().to_adapter()).collect();
            (sources, graph.processors.clone())
        };

        // A processor instance may appear once: wiring it to itself would
        // recurse endlessly through its own emitter.
        for (index, entry) in processors.iter().enumerate() {
            let ptr = processor_ptr(entry.processor().as_ref());
            if processors[index + 1..]
                .iter()
                .any(|other| processor_ptr(other.processor().as_ref()) == ptr)
            {
                return Err(StreamPipeError::Setup(
                    "processor attached more than once".to_string(),
                ));
            }
        }

        let mut wired = Vec::with_capacity(sources.len() + processors.len() + 1);

        for pair in processors.windows(2) {
            let next = pair[1].processor().clone();
            let id = pair[0].processor().emitter().attach(move |packet| next.process(packet));
            let owner: Arc<dyn Adapter> = pair[0].processor().clone();
            wired.push(WiredSlot { owner, id });
        }

        if let Some(last) = processors.last() {
            let core = Arc::downgrade(self);
            let id = last.processor().emitter().attach(move |packet| match core.upgrade() {
                Some(core) => core.emit(packet),
                None => Ok(()),
            });
            let owner: Arc<dyn Adapter> = last.processor().clone();
            wired.push(WiredSlot { owner, id });
        }

        for source in sources {
            let core = Arc::downgrade(self);
            let id = source.emitter().attach(move |packet| {
                if let Some(core) = core.upgrade() {
                    core.process(packet);
                }
                Ok(())
            });
            wired.push(WiredSlot { owner: source, id });
        }

        tracing::trace!(stream = %self.name, slots = wired.len(), "chain wired");
        self.graph.lock().wired = wired;
        Ok(())
    }

    /// Detach every slot `setup` installed. Safe to call when `setup` never
    /// ran.
    fn teardown(&self) {
        let wired: Vec<WiredSlot> = {
            let mut graph = self.graph.lock();
            graph.wired.drain(..).collect()
        };
        if wired.is_empty() {
            return;
        }
        tracing::trace!(stream = %self.name, slots = wired.len(), "tearing down chain");
        for slot in wired {
            slot.owner.emitter().detach(slot.id);
        }
    }

    /// Drop every adapter registration. For a stream-owned reference the
    /// registration holds the adapter's last strong handle, so dropping it
    /// here destroys the adapter; borrowed adapters survive with their
    /// callers.
    pub(crate) fn cleanup(&self) {
        let state = self.state();
        debug_assert!(
            matches!(state, StreamState::None | StreamState::Closed | StreamState::Error),
            "cleanup on a live stream ({state})"
        );
        let mut graph = self.graph.lock();
        graph.wired.clear();
        for source in graph.sources.drain(..) {
            tracing::trace!(stream = %self.name, owned = source.owned(), "removing source");
        }
        for entry in graph.processors.drain(..) {
            tracing::trace!(stream = %self.name, owned = entry.owned(), "removing processor");
        }
    }

    // --- Source lifecycle ---

    fn start_sources(&self) -> Result<()> {
        let sources = self.graph.lock().sources.clone();
        for source in sources.iter().filter(|source| source.sync_state()) {
            match source.handle() {
                SourceHandle::Startable(startable) => {
                    tracing::trace!(stream = %self.name, "starting source");
                    startable.start()?;
                }
                // Unreachable: sync_state is only constructible on the
                // startable handle.
                _ => debug_assert!(false, "lifecycle-synchronized source is not startable"),
            }
        }
        Ok(())
    }

    fn stop_sources(&self) {
        let sources = self.graph.lock().sources.clone();
        for source in sources.iter().filter(|source| source.sync_state()) {
            match source.handle() {
                SourceHandle::Startable(startable) => {
                    tracing::trace!(stream = %self.name, "stopping source");
                    startable.stop();
                }
                _ => debug_assert!(false, "lifecycle-synchronized source is not startable"),
            }
        }
    }

    // --- Dispatch ---

    /// Route one packet through (or around) the processor chain.
    ///
    /// Called by source emitters and by `write`. Chain failures are
    /// captured: the stream transitions to `Error`, the failure lands in
    /// the error slot and on the error signal, and close-on-error runs if
    /// requested.
    pub fn process(&self, packet: &mut dyn Packet) {
        if let Err(err) = self.dispatch(packet) {
            self.capture_error(err);
        }
    }

    fn dispatch(&self, packet: &mut dyn Packet) -> Result<()> {
        // Inactive streams and no-modify packets bypass the chain; the
        // terminal emit still drops anything that arrives while inactive.
        if !self.state_equals(StreamState::Active)
            || packet.flags().contains(PacketFlags::NO_MODIFY)
        {
            return self.emit(packet);
        }

        let _guard = self.proc_lock.lock();

        self.drain_pending_states();

        let first = self.graph.lock().processors.first().map(|entry| entry.processor().clone());
        if let Some(first) = first {
            if first.accepts(packet) {
                // The wired chain carries the packet to the terminal emit.
                return first.process(packet);
            }
            tracing::warn!(
                stream = %self.name,
                packet = packet.class_name(),
                "packet rejected by first processor, proxying"
            );
        }

        self.emit(packet)
    }

    /// Terminal emit: deliver a processed packet to subscribers.
    pub(crate) fn emit(&self, packet: &mut dyn Packet) -> Result<()> {
        if !self.state_equals(StreamState::Active) {
            tracing::debug!(
                stream = %self.name,
                state = %self.state(),
                packet = packet.class_name(),
                "dropping late packet"
            );
            return Ok(());
        }
        if !self.emitter.enabled() || self.emitter.is_empty() {
            tracing::debug!(stream = %self.name, "dropping packet: no subscribers");
            return Ok(());
        }
        self.emitter.emit(packet)
    }

    /// Hand every queued state to every adapter, sources first, each state
    /// observed exactly once in FIFO order. Callers hold the processing
    /// lock so adapters never race a packet.
    fn drain_pending_states(&self) {
        loop {
            let (state, adapters) = {
                let mut graph = self.graph.lock();
                let Some(state) = graph.pending.pop_front() else { return };
                let mut adapters: Vec<Arc<dyn Adapter>> =
                    Vec::with_capacity(graph.sources.len() + graph.processors.len());
                adapters.extend(graph.sources.iter().map(|s| s.handle().to_adapter()));
                adapters.extend(graph.processors.iter().map(|p| {
                    let adapter: Arc<dyn Adapter> = p.processor().clone();
                    adapter
                }));
                (state, adapters)
            };
            tracing::trace!(stream = %self.name, state = %state, "propagating state to adapters");
            for adapter in adapters {
                adapter.on_stream_state_change(state);
            }
        }
    }

    fn capture_error(&self, err: StreamPipeError) {
        tracing::error!(stream = %self.name, error = %err, "processor chain failed");
        self.set_state(StreamState::Error);
        self.graph.lock().error = Some(err.clone());
        self.error_signal.emit(&err);
        if self.close_on_error.load(Ordering::Acquire) {
            tracing::debug!(stream = %self.name, "close on error");
            self.close();
        }
    }

    // --- Introspection ---

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The captured failure, if the stream is (or was) in `Error`.
    pub fn error(&self) -> Option<StreamPipeError> {
        self.graph.lock().error.clone()
    }

    pub fn num_sources(&self) -> usize {
        self.graph.lock().sources.len()
    }

    pub fn num_processors(&self) -> usize {
        self.graph.lock().processors.len()
    }

    pub fn num_adapters(&self) -> usize {
        let graph = self.graph.lock();
        graph.sources.len() + graph.processors.len()
    }

    #[cfg(test)]
    pub(crate) fn processor_refs(&self) -> Vec<ProcessorRef> {
        self.graph.lock().processors.clone()
    }
}

impl Drop for StreamCore {
    fn drop(&mut self) {
        let graph = self.graph.get_mut();
        debug_assert!(graph.sources.is_empty(), "stream core dropped with live sources");
        debug_assert!(graph.processors.is_empty(), "stream core dropped with live processors");
    }
}

impl std::fmt::Debug for StreamCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCore")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("sources", &self.num_sources())
            .field("processors", &self.num_processors())
            .finish()
    }
}
