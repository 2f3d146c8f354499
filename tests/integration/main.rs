//! airbridge integration test harness.
//!
//! Two relay nodes are wired together in-process. Frames a node sends
//! land on a shared in-memory "air" queue; the test decides when each
//! one is delivered to the other node's receive path, so every gap is
//! exact and no test sleeps.
//!
//!   cargo test --test integration

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use airbridge_core::{AirbridgeConfig, LinkFrame, PeerAddress, RelayParams};
use airbridge_services::{
    Delivery, LinkError, LogIndicator, PeerFilter, ReceivePath, ReceiveReassembler, Relay,
    RelayStats, SerialEndpoint, SerialError, SharedReassembler, TransportLink,
};

mod end_to_end;
mod filtering;
mod timing;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const NODE_A: PeerAddress = PeerAddress([0x02, 0, 0, 0, 0, 0x0A]);
pub const NODE_B: PeerAddress = PeerAddress([0x02, 0, 0, 0, 0, 0x0B]);
pub const STRANGER: PeerAddress = PeerAddress([0x02, 0, 0, 0, 0, 0x66]);
pub const CHANNEL: u8 = 1;

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Frames in flight, in send order.
#[derive(Clone, Default)]
pub struct Air(Arc<Mutex<Vec<Vec<u8>>>>);

impl Air {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Payload sizes of raw frames, in order.
pub fn payload_sizes(frames: &[Vec<u8>]) -> Vec<usize> {
    frames
        .iter()
        .map(|raw| LinkFrame::decode(raw).unwrap().payload.len())
        .collect()
}

/// A link that encodes real frames onto the shared air.
pub struct AirLink {
    air: Air,
    local: PeerAddress,
    channel: u8,
    fail: Arc<Mutex<bool>>,
}

impl TransportLink for AirLink {
    fn send(&self, destination: PeerAddress, payload: &[u8]) -> Result<(), LinkError> {
        if *self.fail.lock().unwrap() {
            return Err(LinkError::Busy);
        }
        let raw = LinkFrame {
            channel: self.channel,
            source: self.local,
            destination,
            payload,
        }
        .encode()
        .map_err(|_| LinkError::Oversize {
            len: payload.len(),
            max: 250,
        })?;
        self.air.0.lock().unwrap().push(raw);
        Ok(())
    }

    fn max_payload(&self) -> usize {
        250
    }
}

/// Both ends of a fake serial line. Clones share the same buffers.
#[derive(Clone, Default)]
pub struct SerialPipe {
    input: Arc<Mutex<Vec<u8>>>,
    output: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SerialPipe {
    /// Bytes the attached device "types" into the relay.
    pub fn type_in(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend_from_slice(bytes);
    }

    /// Every write the relay made, one entry per burst.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.output.lock().unwrap().clone()
    }
}

impl SerialEndpoint for SerialPipe {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        let mut input = self.input.lock().unwrap();
        let n = input.len();
        buf.append(&mut input);
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.output.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

pub struct Node {
    pub relay: Relay<AirLink, SerialPipe, LogIndicator>,
    pub receive: ReceivePath,
    pub serial: SerialPipe,
    pub stats: RelayStats,
    pub air: Air,
    link_fail: Arc<Mutex<bool>>,
}

impl Node {
    pub fn new(local: PeerAddress, peer: PeerAddress, params: &RelayParams) -> Self {
        Self::with_filter(local, peer, params, PeerFilter::new(local, CHANNEL, None))
    }

    pub fn with_filter(
        local: PeerAddress,
        peer: PeerAddress,
        params: &RelayParams,
        filter: PeerFilter,
    ) -> Self {
        let air = Air::default();
        let link_fail = Arc::new(Mutex::new(false));
        let serial = SerialPipe::default();
        let stats = RelayStats::new();
        let reassembler = SharedReassembler::new(ReceiveReassembler::new(params));

        let link = AirLink {
            air: air.clone(),
            local,
            channel: CHANNEL,
            fail: link_fail.clone(),
        };
        let receive = ReceivePath::new(filter, reassembler.clone(), stats.clone(), params.chunk_cap);
        let relay = Relay::new(params, peer, link, serial.clone(), reassembler, stats.clone());

        Self {
            relay,
            receive,
            serial,
            stats,
            air,
            link_fail,
        }
    }

    pub fn poll(&mut self, now: Instant) {
        self.relay.poll(now).unwrap();
    }

    pub fn deliver(&self, raw: &[u8], now: Instant) -> Delivery {
        self.receive.deliver_raw(raw, now)
    }

    pub fn set_link_failing(&self, failing: bool) {
        *self.link_fail.lock().unwrap() = failing;
    }
}

/// Parameters derived from the stock configuration (115200 baud,
/// 250-byte chunks, 1024-byte bursts, 50 ms receive timeout).
pub fn default_params() -> RelayParams {
    RelayParams::from_config(&AirbridgeConfig::default()).unwrap()
}

// ── Harness sanity ────────────────────────────────────────────────────────────

#[test]
fn test_default_params_match_documented_values() {
    let p = default_params();
    assert_eq!(p.chunk_cap, 250);
    assert_eq!(p.burst_cap, 1024);
    assert_eq!(p.recv_timeout, ms(50));
    // 20 byte periods at 115200 baud
    assert_eq!(p.send_timeout, Duration::from_nanos(86_805 * 20));
}

#[test]
fn test_air_link_frames_decode() {
    let params = default_params();
    let mut a = Node::new(NODE_A, NODE_B, &params);
    a.serial.type_in(b"ping");
    let t0 = Instant::now();
    a.poll(t0);
    a.poll(t0 + ms(2));

    let frames = a.air.take();
    assert_eq!(frames.len(), 1);
    let frame = LinkFrame::decode(&frames[0]).unwrap();
    assert_eq!(frame.source, NODE_A);
    assert_eq!(frame.destination, NODE_B);
    assert_eq!(frame.channel, CHANNEL);
    assert_eq!(frame.payload, b"ping");
}
