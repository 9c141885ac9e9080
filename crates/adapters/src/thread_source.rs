// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A startable source that feeds packets from its own thread.
//!
//! The stream drives it through the startable lifecycle: `start` spawns a
//! feeder thread emitting the preloaded payloads, `stop` flips the running
//! flag. `stop` never joins — it runs under the stream's processing lock,
//! and the feeder may be blocked on that very lock inside dispatch. The
//! feeder only borrows the emitter through an `Arc`, so letting it wind
//! down on its own is safe.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use streampipe_core::{Adapter, PacketSignal, RawPacket, Result, Startable};

/// Emits a preloaded list of payloads from a spawned thread.
///
/// Payloads are consumed by the first `start`; a restarted source emits
/// nothing until it is reloaded with [`push`](ThreadSource::push).
pub struct ThreadSource {
    emitter: Arc<PacketSignal>,
    payloads: Mutex<Vec<Bytes>>,
    running: Arc<AtomicBool>,
    feeder: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadSource {
    pub fn new(payloads: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            emitter: Arc::new(PacketSignal::new()),
            payloads: Mutex::new(payloads.into_iter().collect()),
            running: Arc::new(AtomicBool::new(false)),
            feeder: Mutex::new(None),
        }
    }

    /// Queue another payload for the next `start`.
    pub fn push(&self, payload: impl Into<Bytes>) {
        self.payloads.lock().push(payload.into());
    }

    /// Wait for the feeder thread to finish emitting.
    ///
    /// Test helper; must not be called from stream callbacks.
    pub fn join(&self) {
        if let Some(handle) = self.feeder.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Adapter for ThreadSource {
    fn emitter(&self) -> &PacketSignal {
        &self.emitter
    }
}

impl Startable for ThreadSource {
    fn start(&self) -> Result<()> {
        let payloads: Vec<Bytes> = self.payloads.lock().drain(..).collect();
        tracing::debug!(payloads = payloads.len(), "thread source starting");

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let emitter = self.emitter.clone();

        let handle = std::thread::spawn(move || {
            for payload in payloads {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let mut packet = RawPacket::new(payload);
                if let Err(error) = emitter.emit(&mut packet) {
                    tracing::warn!(%error, "thread source emit failed, stopping");
                    break;
                }
            }
            tracing::trace!("thread source feeder exiting");
        });
        *self.feeder.lock() = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        tracing::debug!("thread source stopping");
        self.running.store(false, Ordering::Release);
    }
}
