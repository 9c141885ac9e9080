// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end pipeline scenarios using the built-in adapters.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use streampipe_adapters::{FnProcessor, Passthrough, ThreadSource};
use streampipe_core::PacketSignal;
use streampipe_engine::Stream;

fn wait_for(predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn subscribe(stream: &Stream) -> Arc<Mutex<Vec<(ThreadId, Vec<u8>)>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    stream.emitter().attach(move |packet| {
        sink.lock().push((std::thread::current().id(), packet.payload().to_vec()));
        Ok(())
    });
    received
}

#[test]
fn map_processors_compose_in_order() {
    let stream = Stream::new("compose");
    stream
        .attach(
            Arc::new(FnProcessor::map(|payload| {
                let mut out = b"A".to_vec();
                out.extend_from_slice(payload);
                out
            })),
            10,
            true,
        )
        .unwrap();
    stream
        .attach(
            Arc::new(FnProcessor::map(|payload| {
                let mut out = payload.to_vec();
                out.push(b'Z');
                out
            })),
            20,
            true,
        )
        .unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();
    stream.write_bytes(&b"x"[..]);

    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].1, b"AxZ");
}

#[test]
fn thread_source_feeds_the_stream() {
    let stream = Stream::new("threaded");
    let source = Arc::new(ThreadSource::new(
        (0..20).map(|i| Bytes::from(format!("packet-{i}"))),
    ));
    stream.attach_startable_source(source.clone(), false, true).unwrap();
    stream.attach(Arc::new(Passthrough::new()), 10, true).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();

    wait_for(|| received.lock().len() == 20);
    source.join();

    // Per-source ordering is preserved through the serialized dispatch.
    let payloads: Vec<Vec<u8>> = received.lock().iter().map(|(_, p)| p.clone()).collect();
    for (i, payload) in payloads.iter().enumerate() {
        assert_eq!(payload, format!("packet-{i}").as_bytes());
    }

    stream.stop();
    stream.close();
}

#[test]
fn packets_from_multiple_sources_all_arrive() {
    let stream = Stream::new("multi-source");
    let left = Arc::new(ThreadSource::new((0..50).map(|i| Bytes::from(format!("l{i}")))));
    let right = Arc::new(ThreadSource::new((0..50).map(|i| Bytes::from(format!("r{i}")))));
    stream.attach_startable_source(left, true, true).unwrap();
    stream.attach_startable_source(right, true, true).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();

    wait_for(|| received.lock().len() == 100);

    // Cross-source interleaving is unspecified, but each source's own
    // packets stay in submission order.
    let payloads = received.lock();
    let lefts: Vec<&Vec<u8>> = payloads.iter().map(|(_, p)| p).filter(|p| p[0] == b'l').collect();
    for (i, payload) in lefts.iter().enumerate() {
        assert_eq!(**payload, format!("l{i}").into_bytes());
    }

    stream.close();
}

#[test]
fn external_signal_drives_the_stream() {
    let stream = Stream::new("external");
    let signal = Arc::new(PacketSignal::new());
    stream.attach_source_signal(signal.clone()).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();

    let mut packet = streampipe_core::RawPacket::from("pushed");
    signal.emit(&mut packet).unwrap();

    assert_eq!(received.lock()[0].1, b"pushed");
}

#[test]
fn synchronized_output_delivers_on_runtime_threads() {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let stream = Stream::new("synced");
    stream.synchronize_output(runtime.handle()).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();

    let writer_thread = std::thread::current().id();
    stream.write_bytes(&b"marshalled"[..]);

    wait_for(|| !received.lock().is_empty());
    let received = received.lock();
    assert_eq!(received[0].1, b"marshalled");
    assert_ne!(received[0].0, writer_thread);
}

#[test]
fn synchronized_output_combines_with_processors() {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let stream = Stream::new("synced-chain");
    stream
        .attach(Arc::new(FnProcessor::map(|p| p.to_ascii_uppercase())), 10, true)
        .unwrap();
    // The queue installs itself at the terminal order, after the mapper.
    stream.synchronize_output(runtime.handle()).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();
    stream.write_bytes(&b"loud"[..]);

    wait_for(|| !received.lock().is_empty());
    assert_eq!(received.lock()[0].1, b"LOUD");
}

#[test]
fn close_cancels_synchronized_output_without_deadlock() {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let stream = Stream::new("synced-close");
    stream.synchronize_output(runtime.handle()).unwrap();

    let received = subscribe(&stream);
    stream.start().unwrap();
    for i in 0..100 {
        stream.write_bytes(Bytes::from(format!("{i}")));
    }

    // Closing while the queue still holds packets must neither hang nor
    // deliver after the fact: late packets are dropped by the terminal
    // emit guard once the stream leaves Active.
    stream.close();
    assert!(stream.closed());

    let settled = received.lock().len();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(received.lock().len(), settled);
}

#[test]
fn dropping_an_active_stream_is_safe() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let received;
    {
        let stream = Stream::new("dropped");
        stream.synchronize_output(runtime.handle()).unwrap();
        received = subscribe(&stream);
        stream.start().unwrap();
        stream.write_bytes(&b"x"[..]);
    }
    // Stream dropped: close + cleanup ran; the drain task winds down on
    // its own. Nothing to assert beyond "no hang, no panic".
    std::thread::sleep(Duration::from_millis(50));
    drop(received);
}
