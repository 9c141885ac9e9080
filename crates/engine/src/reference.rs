// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Registration records for the stream graph.
//!
//! Every attached adapter is held through a reference record carrying its
//! ordering key, an ownership flag, and — for sources — whether the stream
//! drives the source's start/stop lifecycle.
//!
//! Sources are stored behind a tagged capability view ([`SourceHandle`])
//! instead of being downcast at dispatch time: the startable capability is
//! fixed at registration, so a lifecycle-synchronized reference can only be
//! built from a source that actually implements [`Startable`].
//!
//! [`Startable`]: streampipe_core::Startable

use std::sync::Arc;
use streampipe_core::{Adapter, Processor, SignalAdapter, StartableSource};

/// Tagged view of a registered source.
#[derive(Clone)]
pub enum SourceHandle {
    /// A plain source; the caller drives its lifecycle.
    Adapter(Arc<dyn Adapter>),
    /// A source the stream may start and stop.
    Startable(Arc<dyn StartableSource>),
    /// A wrapped external packet signal.
    Signal(Arc<SignalAdapter>),
}

impl SourceHandle {
    /// Borrow the underlying adapter.
    pub fn as_adapter(&self) -> &dyn Adapter {
        match self {
            Self::Adapter(adapter) => adapter.as_ref(),
            Self::Startable(source) => source.as_ref(),
            Self::Signal(wrapper) => wrapper.as_ref(),
        }
    }

    /// Clone the underlying adapter handle.
    pub fn to_adapter(&self) -> Arc<dyn Adapter> {
        match self {
            Self::Adapter(adapter) => adapter.clone(),
            Self::Startable(source) => {
                let adapter: Arc<dyn Adapter> = source.clone();
                adapter
            }
            Self::Signal(wrapper) => wrapper.clone(),
        }
    }
}

/// Registration record for a source adapter.
#[derive(Clone)]
pub struct SourceRef {
    handle: SourceHandle,
    order: u32,
    owned: bool,
    sync_state: bool,
}

impl SourceRef {
    /// A source whose lifecycle the caller drives.
    pub fn passive(adapter: Arc<dyn Adapter>, owned: bool) -> Self {
        Self { handle: SourceHandle::Adapter(adapter), order: 0, owned, sync_state: false }
    }

    /// A startable source. With `sync_state` set, the stream invokes
    /// `start`/`stop` on it around its own lifecycle transitions.
    pub fn startable(source: Arc<dyn StartableSource>, owned: bool, sync_state: bool) -> Self {
        Self { handle: SourceHandle::Startable(source), order: 0, owned, sync_state }
    }

    /// A wrapped external signal; the wrapper is stream-owned.
    pub(crate) fn signal(wrapper: Arc<SignalAdapter>) -> Self {
        Self { handle: SourceHandle::Signal(wrapper), order: 0, owned: true, sync_state: false }
    }

    pub fn handle(&self) -> &SourceHandle {
        &self.handle
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// True when the stream owns the adapter's lifetime; cleanup dropping
    /// the registration destroys it.
    pub fn owned(&self) -> bool {
        self.owned
    }

    /// True when the stream drives the source's start/stop lifecycle.
    pub fn sync_state(&self) -> bool {
        self.sync_state
    }

    pub(crate) fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }
}

/// Registration record for a processor.
#[derive(Clone)]
pub struct ProcessorRef {
    processor: Arc<dyn Processor>,
    order: u32,
    owned: bool,
}

impl ProcessorRef {
    pub(crate) fn new(processor: Arc<dyn Processor>, order: u32, owned: bool) -> Self {
        Self { processor, order, owned }
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn owned(&self) -> bool {
        self.owned
    }
}

/// Object identity for detach comparisons: the data pointer of the adapter
/// allocation, with the vtable half of the fat pointer discarded.
pub(crate) fn adapter_ptr(adapter: &dyn Adapter) -> *const () {
    adapter as *const dyn Adapter as *const ()
}

pub(crate) fn processor_ptr(processor: &dyn Processor) -> *const () {
    processor as *const dyn Processor as *const ()
}
