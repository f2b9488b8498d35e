//! Link engine behaviour over an in-memory UART with simulated time

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use pgnlink_core::dispatch::{Dispatcher, HandlerError};
use pgnlink_core::link::{LinkState, PresenceChange, Transition};
use pgnlink_core::{LinkConfig, LinkEngine, SendError};
use pgnlink_hal::{UartRx, UartTx};
use pgnlink_protocol::{Frame, Reassembler, Received, MAX_FRAME_SIZE};
use proptest::prelude::*;

/// One direction of a serial line
#[derive(Clone, Default)]
struct Pipe(Rc<RefCell<VecDeque<u8>>>);

impl Pipe {
    fn feed(&self, bytes: &[u8]) {
        self.0.borrow_mut().extend(bytes.iter().copied());
    }

    fn take(&self) -> Vec<u8> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl UartRx for Pipe {
    type Error = Infallible;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let mut queue = self.0.borrow_mut();
        let n = queue.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl UartTx for Pipe {
    type Error = Infallible;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Infallible> {
        self.feed(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

fn encode(source: u8, pgn: u8, payload: &[u8]) -> Vec<u8> {
    Frame::new(source, pgn, payload)
        .unwrap()
        .encode_to_vec()
        .unwrap()
        .to_vec()
}

/// Split captured output into frames and counted announcements
fn decode_output(bytes: &[u8], hello: &str) -> (Vec<Frame>, usize) {
    let mut r = Reassembler::new()
        .with_announcement(pgnlink_protocol::announcement(hello.trim_end_matches("-hello")).unwrap());
    let mut frames = Vec::new();
    let mut announcements = 0;
    r.push(bytes, |item| match item {
        Received::Frame(f) => frames.push(f),
        Received::Announcement => announcements += 1,
    });
    (frames, announcements)
}

/// Handler that records every frame it sees
fn recorder() -> (
    Rc<RefCell<Vec<Frame>>>,
    impl FnMut(&Frame) -> Result<(), HandlerError>,
) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let handler = move |f: &Frame| -> Result<(), HandlerError> {
        sink.borrow_mut().push(f.clone());
        Ok(())
    };
    (seen, handler)
}

#[test]
fn idle_bridge_announces_every_five_seconds() {
    let line = Pipe::default();
    let mut engine = LinkEngine::new(
        Pipe::default(),
        line.clone(),
        LinkConfig::default(),
        Dispatcher::new(),
    )
    .unwrap();

    let mut announced_at = Vec::new();
    for now in 0..=12_000u64 {
        if engine.poll(now).announced {
            announced_at.push(now);
        }
    }

    assert_eq!(announced_at, [0, 5_000, 10_000]);
    assert_eq!(engine.state(), LinkState::Idle);
    assert_eq!(engine.stats().status_sent, 0);
    assert_eq!(line.take(), b"ESP32-hello".repeat(3));
}

#[test]
fn first_valid_frame_starts_status_cadence() {
    let from_peer = Pipe::default();
    let to_peer = Pipe::default();
    let mut engine = LinkEngine::new(
        from_peer.clone(),
        to_peer.clone(),
        LinkConfig::default(),
        Dispatcher::new(),
    )
    .unwrap();

    for now in 0..3_000u64 {
        engine.poll(now);
    }
    to_peer.take();

    // Corrupted frames do not count as the peer being present
    let mut bad = encode(0x7F, 0xFE, &[1, 2, 3]);
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;
    from_peer.feed(&bad);
    let report = engine.poll(3_000);
    assert_eq!(report.link, None);
    assert_eq!(engine.state(), LinkState::Idle);
    assert_eq!(engine.stats().reassembler.checksum_errors, 1);

    from_peer.feed(&encode(0x7F, 0xC8, &[]));
    let report = engine.poll(3_001);
    assert_eq!(report.link, Some(Transition::PeerDetected));
    assert!(report.status_sent);

    let mut status_at = vec![3_001];
    for now in 3_002..=8_001u64 {
        let report = engine.poll(now);
        assert!(!report.announced);
        if report.status_sent {
            status_at.push(now);
        }
    }
    assert_eq!(status_at, [3_001, 4_001, 5_001, 6_001, 7_001, 8_001]);

    let (frames, announcements) = decode_output(&to_peer.take(), "ESP32-hello");
    assert_eq!(announcements, 0);
    assert_eq!(frames.len(), 6);
    for frame in frames {
        assert_eq!(frame.source, 0x50);
        assert_eq!(frame.pgn, 0xFA);
        assert_eq!(&frame.payload[..], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }
}

#[test]
fn status_payload_can_be_replaced() {
    let from_peer = Pipe::default();
    let to_peer = Pipe::default();
    let mut engine = LinkEngine::new(
        from_peer.clone(),
        to_peer.clone(),
        LinkConfig::default(),
        Dispatcher::new(),
    )
    .unwrap();

    from_peer.feed(&encode(0x7F, 0xFE, &[]));
    engine.set_status_payload(&[0x02, 0x10]).unwrap();
    engine.poll(0);

    let (frames, _) = decode_output(&to_peer.take(), "ESP32-hello");
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0].payload[..], &[0x02, 0x10]);
}

#[test]
fn unknown_pgn_and_failing_handler_do_not_stop_the_link() {
    let from_peer = Pipe::default();
    let (seen, mut on_gps) = recorder();
    let mut failing = |_: &Frame| -> Result<(), HandlerError> { Err(HandlerError::Rejected) };

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(0xFE, &mut on_gps).unwrap();
    dispatcher.register(0xEF, &mut failing).unwrap();

    let mut engine = LinkEngine::new(
        from_peer.clone(),
        Pipe::default(),
        LinkConfig::default(),
        dispatcher,
    )
    .unwrap();

    let mut stream = Vec::new();
    stream.extend(encode(0x7F, 0xC8, &[9, 9]));
    stream.extend(encode(0x7F, 0xEF, &[1]));
    stream.extend(encode(0x7F, 0xFE, &[42]));
    from_peer.feed(&stream);

    let report = engine.poll(0);
    assert_eq!(report.frames, 3);

    let stats = engine.stats();
    assert_eq!(stats.dispatch.unrouted, 1);
    assert_eq!(stats.dispatch.handler_failures, 1);
    assert_eq!(stats.dispatch.handled, 1);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(&seen[0].payload[..], &[42]);
}

#[test]
fn host_gates_outbound_on_announcement() {
    let from_bridge = Pipe::default();
    let to_bridge = Pipe::default();
    let mut host = LinkEngine::new(
        from_bridge.clone(),
        to_bridge.clone(),
        LinkConfig::host(),
        Dispatcher::new(),
    )
    .unwrap();

    assert_eq!(host.send(0, 0x7F, 0xFE, &[1]), Err(SendError::PeerAbsent));
    assert_eq!(host.stats().outbound_dropped, 1);
    assert!(to_bridge.take().is_empty());

    // Announcement split across polls, surrounded by noise
    from_bridge.feed(b"\x01\x02ESP3");
    host.poll(100);
    assert!(!host.peer_detected());
    from_bridge.feed(b"2-hello\x03");
    let report = host.poll(200);
    assert_eq!(report.announcements, 1);
    assert_eq!(report.presence, Some(PresenceChange::Detected));

    host.send(200, 0x7F, 0xFE, &[1]).unwrap();
    assert_eq!(to_bridge.take(), encode(0x7F, 0xFE, &[1]));

    // Hosts never announce or send status
    for now in 201..10_200u64 {
        let report = host.poll(now);
        assert!(!report.announced && !report.status_sent);
    }
    assert!(to_bridge.take().is_empty());

    let report = host.poll(10_200);
    assert_eq!(report.presence, Some(PresenceChange::Lost));
    assert_eq!(host.send(10_200, 0x7F, 0xFE, &[1]), Err(SendError::PeerAbsent));
}

#[test]
fn bridge_and_host_bring_the_link_up() {
    let host_to_bridge = Pipe::default();
    let bridge_to_host = Pipe::default();

    let (status_seen, mut on_status) = recorder();
    let mut host_dispatch = Dispatcher::new();
    host_dispatch.register(0xFA, &mut on_status).unwrap();

    let (gps_seen, mut on_gps) = recorder();
    let mut bridge_dispatch = Dispatcher::new();
    bridge_dispatch.register(0xFE, &mut on_gps).unwrap();

    let mut bridge = LinkEngine::new(
        host_to_bridge.clone(),
        bridge_to_host.clone(),
        LinkConfig::default(),
        bridge_dispatch,
    )
    .unwrap();
    let mut host = LinkEngine::new(
        bridge_to_host,
        host_to_bridge,
        LinkConfig::host(),
        host_dispatch,
    )
    .unwrap();

    let mut forwarded = false;
    for now in 0..4_000u64 {
        bridge.poll(now);
        host.poll(now);
        if host.peer_detected() && !forwarded {
            host.send(now, 0x7F, 0xFE, &[7, 7]).unwrap();
            forwarded = true;
        }
    }

    assert!(forwarded);
    assert_eq!(bridge.state(), LinkState::PeerPresent);
    assert_eq!(gps_seen.borrow().len(), 1);
    assert_eq!(bridge.stats().announcements_sent, 1);

    // Status at ~1 s cadence from the first poll after detection
    let statuses = status_seen.borrow();
    assert_eq!(statuses.len(), 4);
    assert!(statuses.iter().all(|f| f.source == 0x50));
}

#[test]
fn default_pair_stays_linked_past_presence_timeout() {
    let host_to_bridge = Pipe::default();
    let bridge_to_host = Pipe::default();

    let (status_seen, mut on_status) = recorder();
    let mut host_dispatch = Dispatcher::new();
    host_dispatch.register(0xFA, &mut on_status).unwrap();

    let mut bridge = LinkEngine::new(
        host_to_bridge.clone(),
        bridge_to_host.clone(),
        LinkConfig::default(),
        Dispatcher::new(),
    )
    .unwrap();
    let mut host = LinkEngine::new(
        bridge_to_host,
        host_to_bridge,
        LinkConfig::host(),
        host_dispatch,
    )
    .unwrap();

    let mut sent = 0;
    for now in 0..30_000u64 {
        bridge.poll(now);
        let report = host.poll(now);
        assert_ne!(report.presence, Some(PresenceChange::Lost), "lost at {now}");
        if now % 100 == 0 {
            assert!(host.send(now, 0x7F, 0xFE, &[1]).is_ok(), "send refused at {now}");
            sent += 1;
        }
    }

    assert_eq!(sent, 300);
    assert!(host.peer_detected());
    assert_eq!(host.stats().outbound_dropped, 0);
    assert_eq!(bridge.state(), LinkState::PeerPresent);
    // The bridge announced once and then relied on status frames
    assert_eq!(bridge.stats().announcements_sent, 1);
    assert_eq!(status_seen.borrow().len(), 30);
}

#[test]
fn overflowing_garbage_is_discarded_and_counted() {
    let from_peer = Pipe::default();
    let mut engine = LinkEngine::new(
        from_peer.clone(),
        Pipe::default(),
        LinkConfig::default(),
        Dispatcher::new(),
    )
    .unwrap();

    // A marker with a plausible length that never completes
    let mut junk = vec![0x80, 0x81, 0x7F, 0xFE, 0xFA];
    junk.resize(2_000, 0x00);
    from_peer.feed(&junk);
    let report = engine.poll(0);
    assert_eq!(report.bytes_read, 2_000);

    let stats = engine.stats();
    assert!(stats.reassembler.overflows >= 1);
    assert!(stats.reassembler.discarded_bytes > 0);

    // The link still works afterwards
    engine.poll(1);
    from_peer.feed(&[0u8; 512]);
    engine.poll(2);
    from_peer.feed(&encode(0x7F, 0xFE, &[]));
    assert_eq!(engine.poll(3).frames, 1);
}

#[test]
fn frames_larger_than_a_read_chunk_are_reassembled() {
    let from_peer = Pipe::default();
    let (seen, mut on_gps) = recorder();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(0xFE, &mut on_gps).unwrap();

    let mut engine = LinkEngine::new(
        from_peer.clone(),
        Pipe::default(),
        LinkConfig::default(),
        dispatcher,
    )
    .unwrap();

    let payload: Vec<u8> = (0..250u8).collect();
    let frame = encode(0x7F, 0xFE, &payload);
    assert_eq!(frame.len(), MAX_FRAME_SIZE);
    from_peer.feed(&frame);

    assert_eq!(engine.poll(0).frames, 1);
    assert_eq!(&seen.borrow()[0].payload[..], &payload[..]);
}

proptest! {
    #[test]
    fn marker_free_noise_never_hides_a_frame(
        noise in prop::collection::vec(0u8..0x80, 0..300),
        payload in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let from_peer = Pipe::default();
        let (seen, mut on_gps) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0xFE, &mut on_gps).unwrap();

        let mut engine = LinkEngine::new(
            from_peer.clone(),
            Pipe::default(),
            LinkConfig::default(),
            dispatcher,
        )
        .unwrap();

        from_peer.feed(&noise);
        engine.poll(0);
        from_peer.feed(&encode(0x7F, 0xFE, &payload));
        engine.poll(1);

        let seen = seen.borrow();
        prop_assert_eq!(seen.len(), 1);
        prop_assert_eq!(&seen[0].payload[..], &payload[..]);
        prop_assert_eq!(engine.state(), LinkState::PeerPresent);
    }
}
