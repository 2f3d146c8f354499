//! Shared timing model for the send and receive paths.
//!
//! Both sides use the same silence heuristic: a deadline that is pushed
//! out by a fixed amount on every contributing event and fires once the
//! source has been quiet for that long. Deadlines are always computed
//! from the caller-supplied `now`, never from the start of a cycle.

use std::time::{Duration, Instant};

/// Bit times per byte on an 8N1 serial line: start + 8 data + stop.
pub const BITS_PER_SERIAL_BYTE: u64 = 10;

/// Byte periods of silence before a partial send chunk is flushed.
pub const DEFAULT_SEND_TIMEOUT_BYTES: u32 = 20;

/// Nominal time to move one byte across a serial line at `baud_rate`.
pub fn byte_period(baud_rate: u32) -> Duration {
    let baud = u64::from(baud_rate.max(1));
    Duration::from_nanos(BITS_PER_SERIAL_BYTE * 1_000_000_000 / baud)
}

/// Send-side idle timeout: `factor` byte periods at `baud_rate`.
///
/// At 115200 baud and the default factor this is ~1.7 ms, long enough to
/// bridge inter-byte gaps inside one framed message and short enough to
/// flush promptly once the sender pauses.
pub fn send_timeout_for_baud(baud_rate: u32, factor: u32) -> Duration {
    byte_period(baud_rate) * factor.max(1)
}

/// An optional monotonic expiry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub const fn unset() -> Self {
        Self(None)
    }

    /// Re-arm to `now + timeout`, replacing any earlier expiry.
    pub fn arm(&mut self, now: Instant, timeout: Duration) {
        self.0 = Some(now + timeout);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// True once `now` has reached an armed deadline. An unset deadline
    /// never expires.
    pub fn expired(&self, now: Instant) -> bool {
        matches!(self.0, Some(at) if now >= at)
    }

    pub fn at(&self) -> Option<Instant> {
        self.0
    }
}
