//! Receive reassembler: coalesces arriving datagrams into serial bursts.
//!
//! The link carries no "more fragments follow" bit, so completion is
//! inferred from silence alone: a burst is flushed once no datagram has
//! arrived for `recv_timeout`. There is no size trigger: a full buffer
//! truncates, it does not flush.
//!
//! Datagrams arrive on the link's receive task while the relay loop
//! ticks on another, so the buffer lives behind [`SharedReassembler`].
//! Every read-modify-write of bytes and deadline happens under its lock.
//!
//! A datagram that lands after the deadline has passed, before the relay
//! loop has ticked, starts a new burst. The expired one waits in a queue
//! and is handed out first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use airbridge_core::{Deadline, RelayParams};
use bytes::{BufMut, BytesMut};

use crate::chunk_types::CompletedBurst;

/// Result of appending one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub accepted: usize,
    pub dropped: usize,
}

pub struct ReceiveReassembler {
    buf: BytesMut,
    cap: usize,
    timeout: Duration,
    deadline: Deadline,
    truncated: usize,
    datagrams: usize,
    completed: VecDeque<CompletedBurst>,
}

impl ReceiveReassembler {
    pub fn new(params: &RelayParams) -> Self {
        Self::with_limits(params.burst_cap, params.recv_timeout)
    }

    pub fn with_limits(cap: usize, timeout: Duration) -> Self {
        Self {
            buf: BytesMut::with_capacity(cap),
            cap,
            timeout,
            deadline: Deadline::unset(),
            truncated: 0,
            datagrams: 0,
            completed: VecDeque::new(),
        }
    }

    /// Append a datagram, dropping whatever does not fit, and push the
    /// completion deadline out to `now + recv_timeout`.
    pub fn on_datagram(&mut self, payload: &[u8], now: Instant) -> Appended {
        if !self.buf.is_empty() && self.deadline.expired(now) {
            let burst = self.flush();
            self.completed.push_back(burst);
        }

        let room = self.cap - self.buf.len();
        let accepted = payload.len().min(room);
        let dropped = payload.len() - accepted;

        self.buf.put_slice(&payload[..accepted]);
        self.truncated += dropped;
        self.datagrams += 1;
        self.deadline.arm(now, self.timeout);

        if dropped > 0 {
            tracing::trace!(dropped, cap = self.cap, "burst buffer full, truncating");
        }
        Appended { accepted, dropped }
    }

    /// Flush the burst once the link has been silent past the deadline.
    pub fn tick(&mut self, now: Instant) -> Option<CompletedBurst> {
        if let Some(burst) = self.completed.pop_front() {
            return Some(burst);
        }
        if self.buf.is_empty() || !self.deadline.expired(now) {
            return None;
        }
        Some(self.flush())
    }

    /// Flush whatever is pending regardless of the deadline. Used on shutdown.
    pub fn drain(&mut self) -> Option<CompletedBurst> {
        if let Some(burst) = self.completed.pop_front() {
            return Some(burst);
        }
        if self.buf.is_empty() {
            return None;
        }
        Some(self.flush())
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

    fn flush(&mut self) -> CompletedBurst {
        let payload = self.buf.split().freeze();
        self.buf.reserve(self.cap);
        self.deadline.clear();
        let burst = CompletedBurst {
            payload,
            truncated: std::mem::take(&mut self.truncated),
            datagrams: std::mem::take(&mut self.datagrams),
        };
        tracing::trace!(
            len = burst.payload.len(),
            datagrams = burst.datagrams,
            truncated = burst.truncated,
            "burst complete"
        );
        burst
    }
}

/// The reassembler as shared between the receive task and the relay loop.
///
/// The lock is a std mutex held only for the append or the flush, never
/// across an await point.
#[derive(Clone)]
pub struct SharedReassembler {
    inner: Arc<Mutex<ReceiveReassembler>>,
}

impl SharedReassembler {
    pub fn new(reassembler: ReceiveReassembler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reassembler)),
        }
    }

    pub fn on_datagram(&self, payload: &[u8], now: Instant) -> Appended {
        self.lock().on_datagram(payload, now)
    }

    pub fn tick(&self, now: Instant) -> Option<CompletedBurst> {
        self.lock().tick(now)
    }

    pub fn drain(&self) -> Option<CompletedBurst> {
        self.lock().drain()
    }

    pub fn pending(&self) -> usize {
        self.lock().pending()
    }

    // A panic while holding the lock cannot leave the buffer longer than
    // its cap, so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, ReceiveReassembler> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
