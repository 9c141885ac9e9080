// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Multicast signals: the emitters that connect the pipeline.
//!
//! Two flavours share the same shape:
//! - [`PacketSignal`] carries packets; slots can fail, and a slot failure
//!   stops delivery and propagates to the emitting caller.
//! - [`Signal`] carries lifecycle events (state changes, close, errors);
//!   slots are infallible observers.
//!
//! Emission is synchronous on the emitting thread. The slot list is
//! snapshotted before callbacks run, so a slot may attach or detach slots
//! on the signal it is being invoked from without deadlocking.

use crate::error::Result;
use crate::packet::Packet;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Handle returned by `attach`, used to detach the same slot later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

type PacketCallback = dyn Fn(&mut dyn Packet) -> Result<()> + Send + Sync;

struct PacketSlot {
    id: u64,
    callback: Arc<PacketCallback>,
}

/// A multicast packet signal with attach/detach/emit.
///
/// Every adapter owns one as its outbound emitter; the stream owns one as
/// its subscriber-facing emitter.
pub struct PacketSignal {
    slots: Mutex<Vec<PacketSlot>>,
    enabled: AtomicBool,
    next_id: AtomicU64,
}

impl Default for PacketSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketSignal {
    pub fn new() -> Self {
        Self { slots: Mutex::new(Vec::new()), enabled: AtomicBool::new(true), next_id: AtomicU64::new(1) }
    }

    /// Attach a slot; returns the id needed to detach it again.
    pub fn attach<F>(&self, callback: F) -> SlotId
    where
        F: Fn(&mut dyn Packet) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push(PacketSlot { id, callback: Arc::new(callback) });
        SlotId(id)
    }

    /// Detach a previously attached slot. Returns false when the id is
    /// unknown (already detached).
    pub fn detach(&self, id: SlotId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|slot| slot.id != id.0);
        let found = slots.len() != before;
        if !found {
            tracing::trace!(slot = id.0, "detach: unknown slot id");
        }
        found
    }

    /// Deliver a packet to every attached slot, in attach order.
    ///
    /// Delivery stops at the first failing slot and the failure propagates
    /// to the caller. Disabled signals swallow the packet.
    pub fn emit(&self, packet: &mut dyn Packet) -> Result<()> {
        if !self.enabled() {
            tracing::trace!(packet = packet.class_name(), "signal disabled, dropping packet");
            return Ok(());
        }
        let snapshot: SmallVec<[Arc<PacketCallback>; 4]> =
            self.slots.lock().iter().map(|slot| slot.callback.clone()).collect();
        for callback in snapshot {
            callback(packet)?;
        }
        Ok(())
    }

    /// Gate emission. A disabled signal drops packets without invoking slots.
    pub fn enable(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// True when no slots are attached.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl std::fmt::Debug for PacketSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketSignal")
            .field("slots", &self.slot_count())
            .field("enabled", &self.enabled())
            .finish()
    }
}

type EventCallback<T> = dyn Fn(&T) + Send + Sync;

/// A multicast event signal for lifecycle notifications.
pub struct Signal<T> {
    slots: Mutex<Vec<(u64, Arc<EventCallback<T>>)>>,
    next_id: AtomicU64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self { slots: Mutex::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    /// Attach an observer; returns the id needed to detach it again.
    pub fn attach<F>(&self, callback: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push((id, Arc::new(callback)));
        SlotId(id)
    }

    pub fn detach(&self, id: SlotId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id.0);
        slots.len() != before
    }

    /// Notify every attached observer, in attach order.
    pub fn emit(&self, value: &T) {
        let snapshot: SmallVec<[Arc<EventCallback<T>>; 4]> =
            self.slots.lock().iter().map(|(_, callback)| callback.clone()).collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("slots", &self.slot_count()).finish()
    }
}
