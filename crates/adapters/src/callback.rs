// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Closure-driven processor.
//!
//! [`FnProcessor`] turns a pair of closures into a full processor, which
//! keeps ad-hoc transforms and test probes from each needing their own
//! type. The process closure receives the packet and the processor's
//! emitter, so it can emit zero, one, or many result packets.

use streampipe_core::{Adapter, Packet, PacketSignal, Processor, RawPacket, Result};

type AcceptFn = dyn Fn(&dyn Packet) -> bool + Send + Sync;
type ProcessFn = dyn Fn(&mut dyn Packet, &PacketSignal) -> Result<()> + Send + Sync;

/// A processor built from closures.
pub struct FnProcessor {
    emitter: PacketSignal,
    accept: Option<Box<AcceptFn>>,
    process: Box<ProcessFn>,
}

impl FnProcessor {
    /// A processor that accepts every packet and runs `process` on it.
    pub fn new<F>(process: F) -> Self
    where
        F: Fn(&mut dyn Packet, &PacketSignal) -> Result<()> + Send + Sync + 'static,
    {
        Self { emitter: PacketSignal::new(), accept: None, process: Box::new(process) }
    }

    /// A processor gated by an accept predicate.
    pub fn with_accept<A, F>(accept: A, process: F) -> Self
    where
        A: Fn(&dyn Packet) -> bool + Send + Sync + 'static,
        F: Fn(&mut dyn Packet, &PacketSignal) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            emitter: PacketSignal::new(),
            accept: Some(Box::new(accept)),
            process: Box::new(process),
        }
    }

    /// A processor that maps each payload to a new payload.
    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        Self::new(move |packet, emitter| {
            let mut out = RawPacket::new(transform(packet.payload()));
            emitter.emit(&mut out)
        })
    }
}

impl Adapter for FnProcessor {
    fn emitter(&self) -> &PacketSignal {
        &self.emitter
    }
}

impl Processor for FnProcessor {
    fn accepts(&self, packet: &dyn Packet) -> bool {
        self.accept.as_ref().is_none_or(|accept| accept(packet))
    }

    fn process(&self, packet: &mut dyn Packet) -> Result<()> {
        (self.process)(packet, &self.emitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use streampipe_core::StreamPipeError;

    fn collect(processor: &FnProcessor) -> Arc<Mutex<Vec<Vec<u8>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        processor.emitter().attach(move |packet| {
            sink.lock().push(packet.payload().to_vec());
            Ok(())
        });
        seen
    }

    #[test]
    fn map_transforms_payload() {
        let processor = FnProcessor::map(|payload| payload.to_ascii_uppercase());
        let seen = collect(&processor);

        let mut packet = RawPacket::from("abc");
        processor.process(&mut packet).unwrap();

        assert_eq!(*seen.lock(), vec![b"ABC".to_vec()]);
    }

    #[test]
    fn process_may_emit_many() {
        let processor = FnProcessor::new(|packet, emitter| {
            for _ in 0..3 {
                let mut out = RawPacket::new(packet.payload().to_vec());
                emitter.emit(&mut out)?;
            }
            Ok(())
        });
        let seen = collect(&processor);

        let mut packet = RawPacket::from("x");
        processor.process(&mut packet).unwrap();
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn accept_predicate_gates() {
        let processor = FnProcessor::with_accept(
            |packet| packet.payload().starts_with(b"ok"),
            |packet, emitter| emitter.emit(packet),
        );

        assert!(processor.accepts(&RawPacket::from("ok: fine")));
        assert!(!processor.accepts(&RawPacket::from("nope")));
    }

    #[test]
    fn process_error_propagates() {
        let processor =
            FnProcessor::new(|_, _| Err(StreamPipeError::Processor("bad frame".to_string())));
        let mut packet = RawPacket::from("x");
        assert!(processor.process(&mut packet).is_err());
    }
}
