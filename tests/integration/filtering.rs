use airbridge_core::wire::FrameError;
use airbridge_services::Rejection;

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Receive filtering on a shared channel
// ══════════════════════════════════════════════════════════════════════════════

fn frame(channel: u8, source: PeerAddress, destination: PeerAddress, payload: &[u8]) -> Vec<u8> {
    LinkFrame {
        channel,
        source,
        destination,
        payload,
    }
    .encode()
    .unwrap()
}

/// With an expected sender configured, a stranger's frame neither lands
/// in the burst nor keeps it open.
#[test]
fn test_stranger_does_not_extend_burst() {
    let params = default_params();
    let mut b = Node::with_filter(
        NODE_B,
        NODE_A,
        &params,
        PeerFilter::new(NODE_B, CHANNEL, Some(NODE_A)),
    );
    let t0 = Instant::now();

    b.deliver(&frame(CHANNEL, NODE_A, NODE_B, b"trusted"), t0);
    let d = b.deliver(&frame(CHANNEL, STRANGER, PeerAddress::BROADCAST, b"noise"), t0 + ms(40));
    assert_eq!(d, Delivery::Rejected(Rejection::UnexpectedSender));

    b.poll(t0 + ms(50));
    assert_eq!(b.serial.written(), vec![b"trusted".to_vec()]);

    let sources = b.stats.sources();
    assert_eq!(sources.len(), 2);
    let stranger = sources.iter().find(|(addr, _)| *addr == STRANGER).unwrap();
    assert_eq!(stranger.1.rejected, 1);
    assert_eq!(stranger.1.accepted, 0);
}

/// Frames broadcast by a node come back to it on a real radio; they must
/// not be relayed to its own serial line.
#[test]
fn test_own_broadcast_echo_ignored() {
    let params = default_params();
    let mut a = Node::new(NODE_A, PeerAddress::BROADCAST, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"hello everyone");
    a.poll(t0);
    a.poll(t0 + ms(2));
    for raw in a.air.take() {
        assert_eq!(a.deliver(&raw, t0 + ms(2)), Delivery::Rejected(Rejection::OwnEcho));
    }
    a.poll(t0 + ms(100));
    assert!(a.serial.written().is_empty());
}

/// Broadcast frames from the peer are accepted like unicast ones.
#[test]
fn test_broadcast_from_peer_accepted() {
    let params = default_params();
    let mut a = Node::new(NODE_A, PeerAddress::BROADCAST, &params);
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"to all");
    a.poll(t0);
    a.poll(t0 + ms(2));
    for raw in a.air.take() {
        assert!(matches!(b.deliver(&raw, t0 + ms(2)), Delivery::Accepted(_)));
    }
    b.poll(t0 + ms(52));
    assert_eq!(b.serial.written(), vec![b"to all".to_vec()]);
}

#[test]
fn test_foreign_traffic_rejected() {
    let params = default_params();
    let b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    assert_eq!(
        b.deliver(&frame(6, NODE_A, NODE_B, b"x"), t0),
        Delivery::Rejected(Rejection::WrongChannel)
    );
    assert_eq!(
        b.deliver(&frame(CHANNEL, NODE_A, STRANGER, b"x"), t0),
        Delivery::Rejected(Rejection::NotForUs)
    );
    assert_eq!(b.stats.snapshot().datagrams_rejected, 2);
    assert_eq!(b.stats.snapshot().datagrams_received, 0);
}

#[test]
fn test_malformed_frames_counted() {
    let params = default_params();
    let b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    let mut bad_version = frame(CHANNEL, NODE_A, NODE_B, b"x");
    bad_version[2] = 9;

    assert!(matches!(
        b.deliver(b"\x00\x01", t0),
        Delivery::Malformed(FrameError::Truncated(2))
    ));
    assert!(matches!(
        b.deliver(&bad_version, t0),
        Delivery::Malformed(FrameError::UnsupportedVersion(9))
    ));
    assert_eq!(b.stats.snapshot().datagrams_malformed, 2);
}
