//! Datagram types: the unit handed between the relay core and the link.

use bytes::Bytes;

/// Why a send chunk left the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The chunk reached the link's payload limit.
    Full,
    /// The serial line went quiet with bytes still pending.
    Timeout,
}

/// A datagram ready to be sent. Never longer than the chunk capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDatagram {
    pub payload: Bytes,
    pub trigger: FlushTrigger,
}

/// A reassembled burst, written to the serial line in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedBurst {
    pub payload: Bytes,
    /// Bytes of this burst dropped because the buffer was full.
    pub truncated: usize,
    /// Datagrams that contributed to the burst.
    pub datagrams: usize,
}
