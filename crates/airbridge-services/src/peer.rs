//! Peer filter: decides which received frames reach the reassembler.
//!
//! The radio is a shared medium. A frame is accepted only if it is on our
//! channel, addressed to us (or broadcast), not our own echo, and, when an
//! expected sender is configured, declares that sender as its source.
//! The source address is self-declared, so this is an allow-list, not
//! authentication.

use airbridge_core::config::LinkConfig;
use airbridge_core::{LinkFrame, PeerAddress};
use serde::Serialize;

/// Why a frame was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    WrongChannel,
    NotForUs,
    OwnEcho,
    UnexpectedSender,
}

#[derive(Debug, Clone)]
pub struct PeerFilter {
    local: PeerAddress,
    channel: u8,
    expected_sender: Option<PeerAddress>,
}

impl PeerFilter {
    pub fn new(local: PeerAddress, channel: u8, expected_sender: Option<PeerAddress>) -> Self {
        Self {
            local,
            channel,
            expected_sender,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.local_address, config.channel, config.expected_sender)
    }

    pub fn check(&self, frame: &LinkFrame<'_>) -> Result<(), Rejection> {
        if frame.channel != self.channel {
            return Err(Rejection::WrongChannel);
        }
        if frame.source == self.local {
            return Err(Rejection::OwnEcho);
        }
        if !frame.destination.is_broadcast() && frame.destination != self.local {
            return Err(Rejection::NotForUs);
        }
        match self.expected_sender {
            Some(expected) if frame.source != expected => Err(Rejection::UnexpectedSender),
            _ => Ok(()),
        }
    }

    pub fn local(&self) -> PeerAddress {
        self.local
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}
