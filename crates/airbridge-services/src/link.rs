//! Collaborator traits for the relay core.
//!
//! The core never touches sockets or tty devices directly. The daemon
//! plugs a radio link and a serial port in behind these traits, and the
//! tests plug in in-memory fakes.

use std::sync::Arc;

use airbridge_core::PeerAddress;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("payload of {len} bytes exceeds link limit {max}")]
    Oversize { len: usize, max: usize },
    #[error("link busy, datagram not queued")]
    Busy,
    #[error("peer {0} is not registered")]
    UnknownPeer(PeerAddress),
    #[error("channel {0} out of range")]
    InvalidChannel(u8),
    #[error("link send failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("serial read failed: {0}")]
    Read(std::io::Error),
    #[error("serial write failed: {0}")]
    Write(std::io::Error),
    #[error("serial port closed")]
    Closed,
}

/// Best-effort datagram transport with a fixed payload limit.
///
/// `send` must not block. Its result is the completion status of this one
/// datagram; the caller never retries.
pub trait TransportLink: Send + Sync {
    fn send(&self, destination: PeerAddress, payload: &[u8]) -> Result<(), LinkError>;

    /// Largest payload a single `send` accepts.
    fn max_payload(&self) -> usize;
}

impl<T: TransportLink + ?Sized> TransportLink for Arc<T> {
    fn send(&self, destination: PeerAddress, payload: &[u8]) -> Result<(), LinkError> {
        (**self).send(destination, payload)
    }

    fn max_payload(&self) -> usize {
        (**self).max_payload()
    }
}

/// Raw serial byte stream.
pub trait SerialEndpoint: Send {
    /// Append whatever bytes are already buffered to `buf` without waiting.
    /// Returns how many were appended; 0 means the line is idle.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError>;

    /// Write all of `bytes`. May block for as long as the line needs.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError>;
}
