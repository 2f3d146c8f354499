//! Relay loop: runs the scheduling pass on a fixed short interval.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use airbridge_services::{IndicatorOutput, Relay, SerialEndpoint, TransportLink};

pub struct RelayLoop<L, S, O>
where
    L: TransportLink,
    S: SerialEndpoint,
    O: IndicatorOutput,
{
    relay: Relay<L, S, O>,
    poll_interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl<L, S, O> RelayLoop<L, S, O>
where
    L: TransportLink,
    S: SerialEndpoint,
    O: IndicatorOutput,
{
    pub fn new(
        relay: Relay<L, S, O>,
        poll_interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            relay,
            poll_interval: poll_interval.max(Duration::from_micros(50)),
            shutdown,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_us = self.poll_interval.as_micros() as u64, "relay loop starting");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    let relay = &mut self.relay;
                    let flushed = tokio::task::block_in_place(|| relay.flush_all(Instant::now()))?;
                    tracing::info!(
                        datagrams = flushed.datagrams_sent,
                        bursts = flushed.bursts_written,
                        "relay loop shutting down"
                    );
                    return Ok(());
                }

                _ = interval.tick() => {
                    // Serial writes block for as long as the line needs.
                    let relay = &mut self.relay;
                    if let Err(e) = tokio::task::block_in_place(|| relay.poll(Instant::now())) {
                        tracing::error!(error = %e, "serial endpoint failed");
                        return Err(e.into());
                    }
                }
            }
        }
    }
}
