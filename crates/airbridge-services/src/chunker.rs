//! Send chunker: turns a serial byte stream into link-sized datagrams.
//!
//! Bytes accumulate in one bounded chunk. The chunk leaves either the
//! moment it reaches capacity, or once the serial line has been quiet
//! for `send_timeout` with at least one byte pending. Each accumulation
//! cycle ends in exactly one flush.

use std::time::{Duration, Instant};

use airbridge_core::{Deadline, RelayParams};
use bytes::{BufMut, BytesMut};

use crate::chunk_types::{FlushTrigger, OutgoingDatagram};

pub struct SendChunker {
    buf: BytesMut,
    cap: usize,
    timeout: Duration,
    deadline: Deadline,
}

impl SendChunker {
    pub fn new(params: &RelayParams) -> Self {
        Self::with_limits(params.chunk_cap, params.send_timeout)
    }

    pub fn with_limits(cap: usize, timeout: Duration) -> Self {
        let cap = cap.max(1);
        Self {
            buf: BytesMut::with_capacity(cap),
            cap,
            timeout,
            deadline: Deadline::unset(),
        }
    }

    /// Append one serial byte.
    ///
    /// Returns the chunk when this byte filled it. The chunk is never left
    /// full across calls, so there is always room for the byte.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<OutgoingDatagram> {
        debug_assert!(self.buf.len() < self.cap);
        self.buf.put_u8(byte);
        self.deadline.arm(now, self.timeout);

        if self.buf.len() >= self.cap {
            return Some(self.flush(FlushTrigger::Full));
        }
        None
    }

    /// Flush a partial chunk whose idle deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<OutgoingDatagram> {
        if self.buf.is_empty() || !self.deadline.expired(now) {
            return None;
        }
        Some(self.flush(FlushTrigger::Timeout))
    }

    /// Flush whatever is pending regardless of the deadline. Used on shutdown.
    pub fn drain(&mut self) -> Option<OutgoingDatagram> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.flush(FlushTrigger::Timeout))
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    fn flush(&mut self, trigger: FlushTrigger) -> OutgoingDatagram {
        let payload = self.buf.split().freeze();
        self.buf.reserve(self.cap);
        self.deadline.clear();
        tracing::trace!(len = payload.len(), ?trigger, "send chunk flushed");
        OutgoingDatagram { payload, trigger }
    }
}
