//! Relay statistics: counters shared by the relay loop, the receive task
//! and the status API.
//!
//! Everything here is observational. The protocol never reads a counter
//! to make a decision; dropped bytes stay silent on the wire and show up
//! only here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use airbridge_core::PeerAddress;
use dashmap::DashMap;
use serde::Serialize;

use crate::chunk_types::FlushTrigger;
use crate::peer::Rejection;

/// Most distinct source addresses tracked at once. Source addresses are
/// self-declared, so the oldest entry is evicted to make room.
pub const MAX_TRACKED_SOURCES: usize = 64;

#[derive(Default)]
struct Counters {
    serial_bytes_in: AtomicU64,
    chunks_full: AtomicU64,
    chunks_timeout: AtomicU64,
    sends_ok: AtomicU64,
    sends_failed: AtomicU64,
    datagrams_received: AtomicU64,
    datagrams_rejected: AtomicU64,
    datagrams_malformed: AtomicU64,
    bursts_flushed: AtomicU64,
    serial_bytes_out: AtomicU64,
    bytes_truncated: AtomicU64,
}

/// Per-source receive counters.
#[derive(Debug, Clone)]
pub struct SourceStats {
    pub accepted: u64,
    pub rejected: u64,
    pub last_reason: Option<Rejection>,
    pub last_seen: Instant,
}

/// Cheap to clone; all clones share the same counters.
#[derive(Clone)]
pub struct RelayStats {
    counters: Arc<Counters>,
    sources: Arc<DashMap<PeerAddress, SourceStats>>,
    started_at: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub serial_bytes_in: u64,
    pub chunks_full: u64,
    pub chunks_timeout: u64,
    pub sends_ok: u64,
    pub sends_failed: u64,
    pub datagrams_received: u64,
    pub datagrams_rejected: u64,
    pub datagrams_malformed: u64,
    pub bursts_flushed: u64,
    pub serial_bytes_out: u64,
    pub bytes_truncated: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            sources: Arc::new(DashMap::new()),
            started_at: Instant::now(),
        }
    }

    pub fn record_serial_in(&self, n: usize) {
        self.counters
            .serial_bytes_in
            .fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_chunk(&self, trigger: FlushTrigger) {
        let counter = match trigger {
            FlushTrigger::Full => &self.counters.chunks_full,
            FlushTrigger::Timeout => &self.counters.chunks_timeout,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send(&self, ok: bool) {
        let counter = if ok {
            &self.counters.sends_ok
        } else {
            &self.counters.sends_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self, source: PeerAddress, dropped: usize) {
        self.counters
            .datagrams_received
            .fetch_add(1, Ordering::Relaxed);
        if dropped > 0 {
            self.counters
                .bytes_truncated
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
        self.touch_source(source, |entry| entry.accepted += 1);
    }

    pub fn record_rejected(&self, source: PeerAddress, reason: Rejection) {
        self.counters
            .datagrams_rejected
            .fetch_add(1, Ordering::Relaxed);
        self.touch_source(source, |entry| {
            entry.rejected += 1;
            entry.last_reason = Some(reason);
        });
    }

    fn touch_source(&self, source: PeerAddress, update: impl FnOnce(&mut SourceStats)) {
        if !self.sources.contains_key(&source) && self.sources.len() >= MAX_TRACKED_SOURCES {
            let oldest = self
                .sources
                .iter()
                .min_by_key(|e| e.value().last_seen)
                .map(|e| *e.key());
            if let Some(addr) = oldest {
                self.sources.remove(&addr);
            }
        }
        let mut entry = self.sources.entry(source).or_insert_with(SourceStats::fresh);
        update(entry.value_mut());
        entry.last_seen = Instant::now();
    }

    pub fn record_malformed(&self) {
        self.counters
            .datagrams_malformed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_burst(&self, len: usize) {
        self.counters.bursts_flushed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .serial_bytes_out
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Total datagrams accepted so far. The relay loop watches this to
    /// notice receive activity without touching the reassembler lock.
    pub fn datagrams_received(&self) -> u64 {
        self.counters.datagrams_received.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.counters;
        StatsSnapshot {
            serial_bytes_in: c.serial_bytes_in.load(Ordering::Relaxed),
            chunks_full: c.chunks_full.load(Ordering::Relaxed),
            chunks_timeout: c.chunks_timeout.load(Ordering::Relaxed),
            sends_ok: c.sends_ok.load(Ordering::Relaxed),
            sends_failed: c.sends_failed.load(Ordering::Relaxed),
            datagrams_received: c.datagrams_received.load(Ordering::Relaxed),
            datagrams_rejected: c.datagrams_rejected.load(Ordering::Relaxed),
            datagrams_malformed: c.datagrams_malformed.load(Ordering::Relaxed),
            bursts_flushed: c.bursts_flushed.load(Ordering::Relaxed),
            serial_bytes_out: c.serial_bytes_out.load(Ordering::Relaxed),
            bytes_truncated: c.bytes_truncated.load(Ordering::Relaxed),
        }
    }

    /// Per-source counters, sorted by address.
    pub fn sources(&self) -> Vec<(PeerAddress, SourceStats)> {
        let mut out: Vec<_> = self
            .sources
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        out.sort_by_key(|(addr, _)| *addr);
        out
    }

    /// Zero every counter and forget all sources. `datagrams_received`
    /// is left alone so the relay loop's activity watermark stays valid.
    pub fn reset(&self) {
        let c = &self.counters;
        for counter in [
            &c.serial_bytes_in,
            &c.chunks_full,
            &c.chunks_timeout,
            &c.sends_ok,
            &c.sends_failed,
            &c.datagrams_rejected,
            &c.datagrams_malformed,
            &c.bursts_flushed,
            &c.serial_bytes_out,
            &c.bytes_truncated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.sources.clear();
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Log a one-line summary. Quiet while nothing has moved.
    pub fn print_stats(&self) {
        let s = self.snapshot();
        if s.serial_bytes_in == 0 && s.datagrams_received == 0 && s.datagrams_rejected == 0 {
            return;
        }
        tracing::info!(
            serial_in = s.serial_bytes_in,
            chunks_full = s.chunks_full,
            chunks_timeout = s.chunks_timeout,
            sends_ok = s.sends_ok,
            sends_failed = s.sends_failed,
            datagrams = s.datagrams_received,
            rejected = s.datagrams_rejected,
            bursts = s.bursts_flushed,
            serial_out = s.serial_bytes_out,
            truncated = s.bytes_truncated,
            "relay stats"
        );
        if s.bytes_truncated > 0 {
            tracing::warn!(
                truncated = s.bytes_truncated,
                "bursts exceeded reassembly capacity"
            );
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStats {
    fn fresh() -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            last_reason: None,
            last_seen: Instant::now(),
        }
    }
}
