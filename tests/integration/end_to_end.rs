use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Serial → radio → serial
// ══════════════════════════════════════════════════════════════════════════════

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// 700 bytes typed in at once leave as 250 + 250 + 200 and come out the
/// far side as a single 700-byte write, even with 5 ms between frames.
#[test]
fn test_700_byte_burst_crosses_intact() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let mut b = Node::new(NODE_B, NODE_A, &params);

    let input = pattern(700);
    a.serial.type_in(&input);

    let t0 = Instant::now();
    a.poll(t0);
    assert_eq!(a.air.len(), 2, "two full chunks leave immediately");
    a.poll(t0 + ms(1));
    assert_eq!(a.air.len(), 2, "tail waits for the send timeout");
    a.poll(t0 + ms(2));

    let frames = a.air.take();
    assert_eq!(payload_sizes(&frames), vec![250, 250, 200]);

    let s = a.stats.snapshot();
    assert_eq!(s.chunks_full, 2);
    assert_eq!(s.chunks_timeout, 1);
    assert_eq!(s.sends_ok, 3);

    for (i, raw) in frames.iter().enumerate() {
        let at = t0 + ms(5 * i as u64);
        assert!(matches!(b.deliver(raw, at), Delivery::Accepted(_)));
        b.poll(at);
    }

    // last frame at +10 ms; burst completes at +60 ms
    b.poll(t0 + ms(59));
    assert!(b.serial.written().is_empty());
    b.poll(t0 + ms(60));

    let written = b.serial.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0], input);
    assert_eq!(b.stats.snapshot().bursts_flushed, 1);
    assert_eq!(b.stats.snapshot().serial_bytes_out, 700);
}

/// Two bursts separated by more than the receive timeout are written as
/// two separate serial writes.
#[test]
fn test_separate_bursts_stay_separate() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"first message");
    a.poll(t0);
    a.poll(t0 + ms(2));
    for raw in a.air.take() {
        b.deliver(&raw, t0 + ms(2));
    }

    let t1 = t0 + ms(100);
    a.serial.type_in(b"second message");
    a.poll(t1);
    a.poll(t1 + ms(2));

    b.poll(t0 + ms(52));
    for raw in a.air.take() {
        b.deliver(&raw, t1 + ms(2));
    }
    b.poll(t1 + ms(52));

    assert_eq!(
        b.serial.written(),
        vec![b"first message".to_vec(), b"second message".to_vec()]
    );
}

/// A burst larger than the burst cap is cut to the cap; the prefix is
/// preserved and the overflow is counted, not reported on the wire.
#[test]
fn test_oversized_burst_truncated_to_cap() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    let input = pattern(1250);
    a.serial.type_in(&input);
    a.poll(t0);

    let frames = a.air.take();
    assert_eq!(payload_sizes(&frames), vec![250; 5]);
    for (i, raw) in frames.iter().enumerate() {
        b.deliver(raw, t0 + ms(i as u64));
    }
    b.poll(t0 + ms(4) + params.recv_timeout);

    let written = b.serial.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].len(), 1024);
    assert_eq!(written[0], input[..1024]);
    assert_eq!(b.stats.snapshot().bytes_truncated, 226);
}

/// Both directions run at once without interfering.
#[test]
fn test_full_duplex() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let mut b = Node::new(NODE_B, NODE_A, &params);
    let t0 = Instant::now();

    a.serial.type_in(b"from a");
    b.serial.type_in(b"from b");
    a.poll(t0);
    b.poll(t0);
    a.poll(t0 + ms(2));
    b.poll(t0 + ms(2));

    for raw in a.air.take() {
        b.deliver(&raw, t0 + ms(3));
    }
    for raw in b.air.take() {
        a.deliver(&raw, t0 + ms(3));
    }
    a.poll(t0 + ms(53));
    b.poll(t0 + ms(53));

    assert_eq!(a.serial.written(), vec![b"from b".to_vec()]);
    assert_eq!(b.serial.written(), vec![b"from a".to_vec()]);
}

/// A failed send loses that chunk; later chunks still go out.
#[test]
fn test_send_failure_drops_only_that_chunk() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    let t0 = Instant::now();

    a.set_link_failing(true);
    a.serial.type_in(b"lost");
    a.poll(t0);
    a.poll(t0 + ms(2));

    a.set_link_failing(false);
    a.serial.type_in(b"kept");
    a.poll(t0 + ms(10));
    a.poll(t0 + ms(12));

    let frames = a.air.take();
    assert_eq!(frames.len(), 1);
    assert_eq!(LinkFrame::decode(&frames[0]).unwrap().payload, b"kept");

    let s = a.stats.snapshot();
    assert_eq!(s.sends_failed, 1);
    assert_eq!(s.sends_ok, 1);
}
