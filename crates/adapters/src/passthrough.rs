// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

use streampipe_core::{Adapter, Packet, PacketSignal, Processor, Result};

/// A processor that does nothing, just passes any packet it receives
/// through. Useful for exercising the pipeline wiring.
#[derive(Default)]
pub struct Passthrough {
    emitter: PacketSignal,
}

impl Passthrough {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for Passthrough {
    fn emitter(&self) -> &PacketSignal {
        &self.emitter
    }
}

impl Processor for Passthrough {
    fn process(&self, packet: &mut dyn Packet) -> Result<()> {
        self.emitter.emit(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use streampipe_core::RawPacket;

    #[test]
    fn forwards_packets_unchanged() {
        let passthrough = Passthrough::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        passthrough.emitter().attach(move |packet| {
            sink.lock().push(packet.payload().to_vec());
            Ok(())
        });

        let mut packet = RawPacket::from("abc");
        passthrough.process(&mut packet).unwrap();

        assert_eq!(*seen.lock(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn accepts_everything_by_default() {
        let passthrough = Passthrough::new();
        let packet = RawPacket::from("x");
        assert!(passthrough.accepts(&packet));
    }
}
