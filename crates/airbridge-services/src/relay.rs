//! Relay: one scheduling pass over both directions.
//!
//! The daemon calls [`Relay::poll`] from a single loop. A pass fires an
//! already expired send timeout, drains the serial input into the chunker
//! (sending each chunk the moment it fills), checks the send timeout again,
//! writes completed bursts to the serial line and advances the activity
//! indicator. The receive side is fed
//! concurrently through [`crate::ReceivePath`]; the only state the two
//! share is the [`SharedReassembler`].

use std::time::Instant;

use airbridge_core::{PeerAddress, RelayParams};

use crate::chunk_types::{CompletedBurst, OutgoingDatagram};
use crate::chunker::SendChunker;
use crate::indicator::{ActivityEvent, ActivityIndicator, IndicatorOutput, LogIndicator};
use crate::link::{SerialEndpoint, SerialError, TransportLink};
use crate::reassembler::SharedReassembler;
use crate::stats::RelayStats;

/// What one pass did. Mostly useful to tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub serial_bytes_in: usize,
    pub datagrams_sent: usize,
    pub send_failures: usize,
    pub bursts_written: usize,
}

pub struct Relay<L, S, O = LogIndicator>
where
    L: TransportLink,
    S: SerialEndpoint,
    O: IndicatorOutput,
{
    peer: PeerAddress,
    chunker: SendChunker,
    reassembler: SharedReassembler,
    link: L,
    serial: S,
    indicator: Option<ActivityIndicator<O>>,
    stats: RelayStats,
    read_buf: Vec<u8>,
    seen_received: u64,
}

impl<L, S, O> Relay<L, S, O>
where
    L: TransportLink,
    S: SerialEndpoint,
    O: IndicatorOutput,
{
    pub fn new(
        params: &RelayParams,
        peer: PeerAddress,
        link: L,
        serial: S,
        reassembler: SharedReassembler,
        stats: RelayStats,
    ) -> Self {
        let chunk_cap = params.chunk_cap.min(link.max_payload());
        if chunk_cap < params.chunk_cap {
            tracing::warn!(
                configured = params.chunk_cap,
                link_max = link.max_payload(),
                "chunk cap clamped to link payload limit"
            );
        }
        let seen_received = stats.datagrams_received();
        Self {
            peer,
            chunker: SendChunker::with_limits(chunk_cap, params.send_timeout),
            reassembler,
            link,
            serial,
            indicator: None,
            stats,
            read_buf: Vec::with_capacity(chunk_cap * 4),
            seen_received,
        }
    }

    pub fn with_indicator(mut self, indicator: ActivityIndicator<O>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// Run one scheduling pass at `now`.
    pub fn poll(&mut self, now: Instant) -> Result<PassSummary, SerialError> {
        let mut summary = PassSummary::default();

        self.read_buf.clear();
        let n = self.serial.read_available(&mut self.read_buf)?;
        if n > 0 {
            self.stats.record_serial_in(n);
            summary.serial_bytes_in = n;
        }

        // A chunk whose deadline passed before these bytes were read
        // belongs to the previous burst.
        if let Some(datagram) = self.chunker.tick(now) {
            self.transmit(datagram, now, &mut summary);
        }

        let mut buf = std::mem::take(&mut self.read_buf);
        for &byte in &buf {
            if let Some(datagram) = self.chunker.feed(byte, now) {
                self.transmit(datagram, now, &mut summary);
            }
        }
        buf.clear();
        self.read_buf = buf;

        if let Some(datagram) = self.chunker.tick(now) {
            self.transmit(datagram, now, &mut summary);
        }

        let received = self.stats.datagrams_received();
        if received != self.seen_received {
            self.seen_received = received;
            self.notify(ActivityEvent::DatagramReceived, now);
        }

        while let Some(burst) = self.reassembler.tick(now) {
            self.write_burst(burst, now)?;
            summary.bursts_written += 1;
        }

        if let Some(indicator) = self.indicator.as_mut() {
            indicator.tick(now);
        }

        Ok(summary)
    }

    /// Flush everything pending in both directions. Called once on shutdown.
    pub fn flush_all(&mut self, now: Instant) -> Result<PassSummary, SerialError> {
        let mut summary = PassSummary::default();
        if let Some(datagram) = self.chunker.drain() {
            self.transmit(datagram, now, &mut summary);
        }
        while let Some(burst) = self.reassembler.drain() {
            self.write_burst(burst, now)?;
            summary.bursts_written += 1;
        }
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.reset();
        }
        Ok(summary)
    }

    fn transmit(&mut self, datagram: OutgoingDatagram, now: Instant, summary: &mut PassSummary) {
        self.stats.record_chunk(datagram.trigger);
        self.notify(ActivityEvent::SendAttempted, now);

        // The chunk is already gone from the chunker; a failed send is lost.
        match self.link.send(self.peer, &datagram.payload) {
            Ok(()) => {
                tracing::debug!(
                    len = datagram.payload.len(),
                    trigger = ?datagram.trigger,
                    peer = %self.peer,
                    "datagram sent"
                );
                self.stats.record_send(true);
                summary.datagrams_sent += 1;
                self.notify(ActivityEvent::SendSucceeded, now);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    len = datagram.payload.len(),
                    peer = %self.peer,
                    "datagram send failed, dropping"
                );
                self.stats.record_send(false);
                summary.send_failures += 1;
                self.notify(ActivityEvent::SendFailed, now);
            }
        }
    }

    fn write_burst(&mut self, burst: CompletedBurst, now: Instant) -> Result<(), SerialError> {
        let len = burst.payload.len();
        self.serial.write(&burst.payload)?;
        self.stats.record_burst(len);
        if burst.truncated > 0 {
            tracing::debug!(len, truncated = burst.truncated, "truncated burst written to serial");
        } else {
            tracing::debug!(len, datagrams = burst.datagrams, "burst written to serial");
        }
        self.notify(ActivityEvent::BurstFlushed { len }, now);
        Ok(())
    }

    fn notify(&mut self, event: ActivityEvent, now: Instant) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.notify(event, now);
        }
    }

    pub fn pending_send(&self) -> usize {
        self.chunker.pending()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn indicator(&self) -> Option<&ActivityIndicator<O>> {
        self.indicator.as_ref()
    }
}
