// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::fixtures::{StateProbe, TagProcessor, state_log, trace_log};
use crate::Stream;
use std::sync::Arc;
use streampipe_core::{PacketSignal, Processor, StreamPipeError};

#[test]
fn processors_sort_ascending_with_stable_ties() {
    let stream = Stream::new("ordering");
    let log = state_log();

    let a: Arc<dyn Processor> = Arc::new(StateProbe::new("a", log.clone()));
    let b: Arc<dyn Processor> = Arc::new(StateProbe::new("b", log.clone()));
    let c: Arc<dyn Processor> = Arc::new(StateProbe::new("c", log.clone()));
    let d: Arc<dyn Processor> = Arc::new(StateProbe::new("d", log));

    stream.attach(a.clone(), 20, false).unwrap();
    stream.attach(b.clone(), 10, false).unwrap();
    stream.attach(c.clone(), 0, false).unwrap(); // rewritten to list length (2)
    stream.attach(d.clone(), 10, false).unwrap();

    let refs = stream.core().processor_refs();
    let orders: Vec<u32> = refs.iter().map(|r| r.order()).collect();
    assert_eq!(orders, vec![2, 10, 10, 20]);

    // Equal orders keep insertion order: b (attached before d) comes first.
    assert!(Arc::ptr_eq(refs[0].processor(), &c));
    assert!(Arc::ptr_eq(refs[1].processor(), &b));
    assert!(Arc::ptr_eq(refs[2].processor(), &d));
    assert!(Arc::ptr_eq(refs[3].processor(), &a));
}

#[test]
fn append_order_preserves_insertion() {
    let stream = Stream::new("append");
    let log = trace_log();

    for tag in ["p1", "p2", "p3"] {
        stream.attach(Arc::new(TagProcessor::new(tag, "", "", log.clone())), 0, true).unwrap();
    }

    let refs = stream.core().processor_refs();
    let orders: Vec<u32> = refs.iter().map(|r| r.order()).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert!(refs.iter().all(|entry| entry.owned()));
}

#[test]
fn order_out_of_range_is_rejected() {
    let stream = Stream::new("range");
    let log = trace_log();

    let err = stream
        .attach(Arc::new(TagProcessor::new("p", "", "", log)), 102, true)
        .unwrap_err();
    assert_eq!(err, StreamPipeError::InvalidOrder(102));
    assert_eq!(stream.num_processors(), 0);
}

#[test]
fn mutation_while_active_fails_and_leaves_graph_unchanged() {
    let stream = Stream::new("frozen");
    let log = trace_log();

    let processor = Arc::new(TagProcessor::new("p", "", "", log.clone()));
    stream.attach(processor.clone(), 10, false).unwrap();
    let source = Arc::new(PacketSignal::new());
    stream.attach_source_signal(source.clone()).unwrap();
    stream.start().unwrap();

    let extra = Arc::new(TagProcessor::new("extra", "", "", log));
    assert_eq!(stream.attach(extra, 20, true).unwrap_err(), StreamPipeError::MutationWhileActive);
    assert_eq!(
        stream.detach(processor.as_ref()).unwrap_err(),
        StreamPipeError::MutationWhileActive
    );
    assert_eq!(
        stream.attach_source_signal(Arc::new(PacketSignal::new())).unwrap_err(),
        StreamPipeError::MutationWhileActive
    );
    assert_eq!(
        stream.detach_source_signal(&source).unwrap_err(),
        StreamPipeError::MutationWhileActive
    );

    assert_eq!(stream.num_processors(), 1);
    assert_eq!(stream.num_sources(), 1);

    // Mutation is legal again once the stream stops.
    stream.stop();
    assert!(stream.detach(processor.as_ref()).unwrap());
    assert_eq!(stream.num_processors(), 0);
}

#[test]
fn detach_reports_whether_found() {
    let stream = Stream::new("detach");
    let log = trace_log();

    let processor = Arc::new(TagProcessor::new("p", "", "", log.clone()));
    stream.attach(processor.clone(), 10, true).unwrap();

    assert!(stream.detach(processor.as_ref()).unwrap());
    assert!(!stream.detach(processor.as_ref()).unwrap());

    let stranger = TagProcessor::new("q", "", "", log);
    assert!(!stream.detach(&stranger).unwrap());
}

#[test]
fn source_signal_attach_and_detach() {
    let stream = Stream::new("signals");
    let signal = Arc::new(PacketSignal::new());

    stream.attach_source_signal(signal.clone()).unwrap();
    assert_eq!(stream.num_sources(), 1);
    assert_eq!(stream.core().num_adapters(), 1);

    assert!(stream.detach_source_signal(&signal).unwrap());
    assert_eq!(stream.num_sources(), 0);
    assert!(!stream.detach_source_signal(&signal).unwrap());
}

#[test]
fn detach_source_by_identity() {
    let stream = Stream::new("sources");
    let log = state_log();

    let source = Arc::new(StateProbe::new("src", log));
    stream.attach_source(source.clone(), false).unwrap();
    assert_eq!(stream.num_sources(), 1);

    assert!(stream.detach_source(source.as_ref()).unwrap());
    assert!(!stream.detach_source(source.as_ref()).unwrap());
    assert_eq!(stream.num_sources(), 0);
}
