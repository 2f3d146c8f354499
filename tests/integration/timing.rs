use airbridge_core::config::AirbridgeConfig;

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Silence timeouts
// ══════════════════════════════════════════════════════════════════════════════

/// Bytes arriving closer together than the send timeout stay in one chunk;
/// the timeout is measured from the last byte, not the first.
#[test]
fn test_trickle_within_timeout_is_one_chunk() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let t0 = Instant::now();

    for (i, byte) in b"slowly".iter().enumerate() {
        a.serial.type_in(&[*byte]);
        a.poll(t0 + ms(i as u64));
    }
    // last byte at +5 ms, timeout ~1.74 ms
    a.poll(t0 + ms(6));
    assert_eq!(a.air.len(), 0);
    a.poll(t0 + ms(7));

    let frames = a.air.take();
    assert_eq!(frames.len(), 1);
    assert_eq!(LinkFrame::decode(&frames[0]).unwrap().payload, b"slowly");
}

#[test]
fn test_pause_longer_than_timeout_splits_chunks() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"abc");
    a.poll(t0);
    a.poll(t0 + ms(2));
    a.serial.type_in(b"def");
    a.poll(t0 + ms(2));
    a.poll(t0 + ms(4));

    assert_eq!(payload_sizes(&a.air.take()), vec![3, 3]);
}

/// The relay loop may not run during a pause at all; the next burst's
/// bytes are already waiting when it does. They still start a new chunk.
#[test]
fn test_pause_without_intermediate_pass_splits_chunks() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"abc");
    a.poll(t0);
    a.serial.type_in(b"def");
    a.poll(t0 + ms(5));
    a.poll(t0 + ms(10));

    let frames = a.air.take();
    let payloads: Vec<Vec<u8>> = frames
        .iter()
        .map(|f| LinkFrame::decode(f).unwrap().payload.to_vec())
        .collect();
    assert_eq!(payloads, vec![b"abc".to_vec(), b"def".to_vec()]);
}

/// The send timeout scales with the baud rate: 20 byte periods.
#[test]
fn test_send_timeout_follows_baud_rate() {
    let mut config = AirbridgeConfig::default();
    config.serial.baud_rate = 9600;
    let params = RelayParams::from_config(&config).unwrap();
    // ~20.8 ms
    assert!(params.send_timeout > ms(20) && params.send_timeout < ms(21));

    let mut a = Node::new(NODE_A, NODE_B, &params);
    let t0 = Instant::now();
    a.serial.type_in(b"at 9600");
    a.poll(t0);
    a.poll(t0 + ms(20));
    assert_eq!(a.air.len(), 0);
    a.poll(t0 + ms(21));
    assert_eq!(a.air.len(), 1);
}

/// A datagram landing just inside the receive timeout extends the burst;
/// the flush only happens after the link has gone quiet.
#[test]
fn test_receive_timeout_slides_with_each_datagram() {
    let params = default_params();
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    let raw = |payload: &[u8]| {
        LinkFrame {
            channel: CHANNEL,
            source: NODE_A,
            destination: NODE_B,
            payload,
        }
        .encode()
        .unwrap()
    };

    for i in 0..5u64 {
        let at = t0 + ms(i * 49);
        b.deliver(&raw(&[b'0' + i as u8]), at);
        b.poll(at);
    }
    assert!(b.serial.written().is_empty());

    b.poll(t0 + ms(4 * 49 + 50));
    assert_eq!(b.serial.written(), vec![b"01234".to_vec()]);

    // idle afterwards
    b.poll(t0 + ms(1000));
    assert_eq!(b.serial.written().len(), 1);
}

/// A datagram arriving after the receive timeout has elapsed starts a new
/// burst even if the relay loop has not flushed the old one yet.
#[test]
fn test_late_datagram_starts_new_burst_before_flush() {
    let params = default_params();
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    let raw = |payload: &[u8]| {
        LinkFrame {
            channel: CHANNEL,
            source: NODE_A,
            destination: NODE_B,
            payload,
        }
        .encode()
        .unwrap()
    };

    b.deliver(&raw(b"d1"), t0);
    b.deliver(&raw(b"d2"), t0 + ms(60));
    b.poll(t0 + ms(200));
    assert_eq!(b.serial.written(), vec![b"d1".to_vec(), b"d2".to_vec()]);
}
