//! Link wire format: the on-air unit of the emulated radio.
//!
//! Every datagram the relay sends travels as one link frame: a fixed
//! 16-byte header followed by at most `LINK_MAX_PAYLOAD` payload bytes.
//! The header carries only what the radio itself would know (channel,
//! source and destination hardware addresses). There is no sequence
//! number, no fragment bit and no checksum; the relay core never sees
//! any of it.
//!
//! The header is #[repr(C, packed)] and uses zerocopy derives for
//! allocation-free parsing. There is no unsafe code in this module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Limits ───────────────────────────────────────────────────────────────────

/// Hard payload limit of the radio. A single send never carries more.
pub const LINK_MAX_PAYLOAD: usize = 250;

/// First two bytes of every link frame.
pub const LINK_MAGIC: [u8; 2] = *b"AB";

/// Link frame format version. Frames with another version are dropped.
pub const LINK_VERSION: u8 = 1;

/// Valid logical channels, inclusive.
pub const CHANNEL_MIN: u8 = 1;
pub const CHANNEL_MAX: u8 = 14;

// ── Addresses ────────────────────────────────────────────────────────────────

/// A 6-byte radio hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    /// Sentinel destination reaching every listener on the channel.
    pub const BROADCAST: PeerAddress = PeerAddress([0xff; 6]);

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("expected 6 colon-separated octets, got {0}")]
    WrongLength(usize),
    #[error("invalid octet: {0}")]
    BadOctet(#[from] hex::FromHexError),
}

impl FromStr for PeerAddress {
    type Err = AddressParseError;

    /// Accepts `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` or `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        let bytes = hex::decode(&compact)?;
        if bytes.len() != 6 {
            return Err(AddressParseError::WrongLength(bytes.len()));
        }
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bytes);
        Ok(PeerAddress(octets))
    }
}

impl Serialize for PeerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PeerAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Link Header ──────────────────────────────────────────────────────────────

/// Prefix of every link frame.
///
/// Wire size: 16 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct LinkHeader {
    /// Always `LINK_MAGIC`. Anything else on the port is not ours.
    pub magic: [u8; 2],

    /// Frame format version. Currently 0x01.
    pub version: u8,

    /// Logical radio channel, `CHANNEL_MIN..=CHANNEL_MAX`.
    /// Receivers drop frames from other channels.
    pub channel: u8,

    /// Declared hardware address of the sender. Not authenticated; the
    /// receiver's allow-list is a weak filter only.
    pub source: [u8; 6],

    /// Destination hardware address, or all-ones for broadcast.
    pub destination: [u8; 6],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(LinkHeader, [u8; 16]);

pub const LINK_HEADER_LEN: usize = std::mem::size_of::<LinkHeader>();

/// Largest frame the emulated radio ever puts on the wire.
pub const LINK_MAX_FRAME: usize = LINK_HEADER_LEN + LINK_MAX_PAYLOAD;

// ── Frames ───────────────────────────────────────────────────────────────────

/// A decoded link frame, borrowing its payload from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame<'a> {
    pub channel: u8,
    pub source: PeerAddress,
    pub destination: PeerAddress,
    pub payload: &'a [u8],
}

/// Why a received frame could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame shorter than link header ({0} bytes)")]
    Truncated(usize),
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported link version {0}")]
    UnsupportedVersion(u8),
    #[error("payload of {0} bytes exceeds radio limit")]
    Oversize(usize),
}

impl<'a> LinkFrame<'a> {
    /// Decode a frame from a raw datagram.
    pub fn decode(raw: &'a [u8]) -> Result<Self, FrameError> {
        let header =
            LinkHeader::read_from_prefix(raw).ok_or(FrameError::Truncated(raw.len()))?;
        if header.magic != LINK_MAGIC {
            return Err(FrameError::BadMagic);
        }
        if header.version != LINK_VERSION {
            return Err(FrameError::UnsupportedVersion(header.version));
        }
        let payload = &raw[LINK_HEADER_LEN..];
        if payload.len() > LINK_MAX_PAYLOAD {
            return Err(FrameError::Oversize(payload.len()));
        }
        Ok(Self {
            channel: header.channel,
            source: PeerAddress(header.source),
            destination: PeerAddress(header.destination),
            payload,
        })
    }

    /// Encode into `out`, replacing its contents.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), FrameError> {
        if self.payload.len() > LINK_MAX_PAYLOAD {
            return Err(FrameError::Oversize(self.payload.len()));
        }
        let header = LinkHeader {
            magic: LINK_MAGIC,
            version: LINK_VERSION,
            channel: self.channel,
            source: self.source.octets(),
            destination: self.destination.octets(),
        };
        out.clear();
        out.reserve(LINK_HEADER_LEN + self.payload.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(self.payload);
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }
}
