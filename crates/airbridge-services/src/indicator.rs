//! Activity indicator: a pulse output driven by relay events.
//!
//! Purely observational. An event that is enabled in the policy turns the
//! output on and (re)arms an off-deadline; `tick` turns it off once that
//! passes. Nothing on the send or receive path waits on the indicator.

use std::time::{Duration, Instant};

use airbridge_core::config::IndicatorConfig;
use airbridge_core::Deadline;

/// Something the relay did that the indicator may want to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    SendAttempted,
    SendSucceeded,
    SendFailed,
    DatagramReceived,
    BurstFlushed { len: usize },
}

/// Physical or virtual output the pulse is written to.
pub trait IndicatorOutput: Send {
    fn set(&mut self, on: bool);
}

impl<T: IndicatorOutput + ?Sized> IndicatorOutput for Box<T> {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}

/// Output that only logs. Default when no LED is configured.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl IndicatorOutput for LogIndicator {
    fn set(&mut self, on: bool) {
        tracing::trace!(on, "activity indicator");
    }
}

/// Which events light the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPolicy {
    pub on_send: bool,
    pub on_send_success: bool,
    pub on_send_failure: bool,
    pub on_receive: bool,
    /// 0 disables burst pulses.
    pub burst_threshold: usize,
}

impl IndicatorPolicy {
    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self {
            on_send: config.on_send,
            on_send_success: config.on_send_success,
            on_send_failure: config.on_send_failure,
            on_receive: config.on_receive,
            burst_threshold: config.burst_threshold,
        }
    }

    pub fn wants(&self, event: ActivityEvent) -> bool {
        match event {
            ActivityEvent::SendAttempted => self.on_send,
            ActivityEvent::SendSucceeded => self.on_send_success,
            ActivityEvent::SendFailed => self.on_send_failure,
            ActivityEvent::DatagramReceived => self.on_receive,
            ActivityEvent::BurstFlushed { len } => {
                self.burst_threshold > 0 && len >= self.burst_threshold
            }
        }
    }
}

pub struct ActivityIndicator<O: IndicatorOutput> {
    output: O,
    policy: IndicatorPolicy,
    pulse: Duration,
    off_at: Deadline,
    lit: bool,
}

impl<O: IndicatorOutput> ActivityIndicator<O> {
    pub fn new(output: O, policy: IndicatorPolicy, pulse: Duration) -> Self {
        Self {
            output,
            policy,
            pulse,
            off_at: Deadline::unset(),
            lit: false,
        }
    }

    pub fn from_config(output: O, config: &IndicatorConfig) -> Self {
        Self::new(
            output,
            IndicatorPolicy::from_config(config),
            Duration::from_millis(config.pulse_ms),
        )
    }

    pub fn notify(&mut self, event: ActivityEvent, now: Instant) {
        if !self.policy.wants(event) {
            return;
        }
        if !self.lit {
            self.output.set(true);
            self.lit = true;
        }
        self.off_at.arm(now, self.pulse);
    }

    pub fn tick(&mut self, now: Instant) {
        if self.lit && self.off_at.expired(now) {
            self.output.set(false);
            self.lit = false;
            self.off_at.clear();
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Force the output off, e.g. on shutdown.
    pub fn reset(&mut self) {
        if self.lit {
            self.output.set(false);
        }
        self.lit = false;
        self.off_at.clear();
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}
