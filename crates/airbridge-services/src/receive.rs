//! Receive path: from a raw link frame to the reassembler.
//!
//! Called from the link's receive task for every datagram that arrives.
//! Decoding, filtering and the append all happen here so the daemon's
//! socket loop stays a thin read-and-forward.

use std::time::Instant;

use airbridge_core::wire::FrameError;
use airbridge_core::LinkFrame;

use crate::peer::{PeerFilter, Rejection};
use crate::reassembler::{Appended, SharedReassembler};
use crate::stats::RelayStats;

/// What happened to one received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted(Appended),
    Rejected(Rejection),
    Malformed(FrameError),
}

#[derive(Clone)]
pub struct ReceivePath {
    filter: PeerFilter,
    reassembler: SharedReassembler,
    stats: RelayStats,
    chunk_cap: usize,
}

impl ReceivePath {
    pub fn new(
        filter: PeerFilter,
        reassembler: SharedReassembler,
        stats: RelayStats,
        chunk_cap: usize,
    ) -> Self {
        Self {
            filter,
            reassembler,
            stats,
            chunk_cap,
        }
    }

    /// Handle one raw datagram as read from the link.
    pub fn deliver_raw(&self, raw: &[u8], now: Instant) -> Delivery {
        match LinkFrame::decode(raw) {
            Ok(frame) => self.deliver(&frame, now),
            Err(e) => {
                tracing::trace!(error = %e, len = raw.len(), "undecodable link frame, discarding");
                self.stats.record_malformed();
                Delivery::Malformed(e)
            }
        }
    }

    /// Handle one decoded frame.
    pub fn deliver(&self, frame: &LinkFrame<'_>, now: Instant) -> Delivery {
        if frame.payload.len() > self.chunk_cap {
            tracing::debug!(
                source = %frame.source,
                len = frame.payload.len(),
                cap = self.chunk_cap,
                "datagram larger than chunk cap, discarding"
            );
            self.stats.record_malformed();
            return Delivery::Malformed(FrameError::Oversize(frame.payload.len()));
        }

        if let Err(reason) = self.filter.check(frame) {
            tracing::debug!(source = %frame.source, ?reason, "datagram rejected");
            self.stats.record_rejected(frame.source, reason);
            return Delivery::Rejected(reason);
        }

        let appended = self.reassembler.on_datagram(frame.payload, now);
        self.stats.record_accepted(frame.source, appended.dropped);
        tracing::trace!(
            source = %frame.source,
            len = frame.payload.len(),
            dropped = appended.dropped,
            "datagram received"
        );
        Delivery::Accepted(appended)
    }
}
