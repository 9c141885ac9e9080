// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The synchronized output bridge.
//!
//! [`SyncQueue`] is a terminal processor that hands packets to an external
//! tokio runtime: `process` clones the packet onto a channel, and a drain
//! task spawned on the runtime forwards each packet through the queue's
//! emitter on a runtime thread. Subscribers behind a `synchronize_output`
//! stream therefore never run on the dispatch thread.
//!
//! The queue is cancellable: once it observes the stream entering `Closed`
//! it stops accepting, the drain task exits after the packet in flight, and
//! anything still queued is dropped with the channel. Cancellation is a
//! flag flip, never a join, so the close path cannot deadlock on the
//! runtime.

use std::sync::Arc;
use streampipe_core::{
    Adapter, Packet, PacketSignal, Processor, Result, StreamPipeError, StreamState,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal processor that marshals emission onto a tokio runtime.
///
/// Installed at the reserved terminal order by
/// [`Stream::synchronize_output`](crate::Stream::synchronize_output).
pub struct SyncQueue {
    emitter: PacketSignal,
    queue_tx: mpsc::UnboundedSender<Box<dyn Packet>>,
    cancel: CancellationToken,
}

impl SyncQueue {
    /// Create the queue and spawn its drain task on `handle`.
    pub fn spawn(handle: &tokio::runtime::Handle) -> Arc<Self> {
        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<Box<dyn Packet>>();
        let cancel = CancellationToken::new();

        let queue =
            Arc::new(Self { emitter: PacketSignal::new(), queue_tx, cancel: cancel.clone() });

        // The task holds a weak handle: dropping the last registration of
        // the queue (stream cleanup) ends the task instead of the task
        // keeping the queue alive.
        let weak = Arc::downgrade(&queue);
        handle.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    packet = queue_rx.recv() => {
                        let Some(mut packet) = packet else { break };
                        let Some(queue) = weak.upgrade() else { break };
                        if let Err(error) = queue.emitter.emit(&mut *packet) {
                            tracing::warn!(%error, "synchronized output emit failed");
                        }
                    }
                }
            }
            tracing::trace!("synchronized output drain task exiting");
        });

        queue
    }

    /// True once the queue has observed the stream closing.
    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Adapter for SyncQueue {
    fn emitter(&self) -> &PacketSignal {
        &self.emitter
    }

    fn on_stream_state_change(&self, state: StreamState) {
        if state == StreamState::Closed {
            tracing::debug!("cancelling synchronized output");
            self.cancel.cancel();
        }
    }
}

impl Processor for SyncQueue {
    fn process(&self, packet: &mut dyn Packet) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::debug!(packet = packet.class_name(), "output cancelled, dropping packet");
            return Ok(());
        }
        // A closed channel without cancellation means the runtime went away
        // under us; surface that as a stream error.
        self.queue_tx
            .send(packet.clone_packet())
            .map_err(|_| StreamPipeError::OutputClosed)
    }
}
