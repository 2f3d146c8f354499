//! Emulated radio link over UDP.
//!
//! Each radio frame travels as one UDP datagram: a [`LinkHeader`] followed
//! by the payload. The socket is usually bound with broadcast enabled, so
//! every node on the segment hears every frame and filtering happens on
//! receive, the way a shared radio channel behaves.
//!
//! [`LinkHeader`]: airbridge_core::wire::LinkHeader

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use airbridge_core::wire::{CHANNEL_MAX, CHANNEL_MIN, LINK_MAX_FRAME, LINK_MAX_PAYLOAD};
use airbridge_core::{LinkFrame, PeerAddress};
use airbridge_services::{Delivery, LinkError, ReceivePath, TransportLink};

pub struct UdpLink {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    local: PeerAddress,
    channel: u8,
    peers: Vec<PeerAddress>,
}

impl UdpLink {
    /// Bind the link socket. Frames go to `remote`, normally the segment's
    /// broadcast address.
    pub fn bind(bind: SocketAddr, remote: SocketAddr, local: PeerAddress) -> Result<Self> {
        let socket = make_link_socket(bind).context("failed to create link socket")?;
        let socket = UdpSocket::from_std(socket).context("failed to convert to tokio UdpSocket")?;
        Ok(Self {
            socket: Arc::new(socket),
            remote,
            local,
            channel: CHANNEL_MIN,
            peers: Vec::new(),
        })
    }

    /// Register a destination and the channel frames are sent on.
    /// Sending to an address that was never registered fails.
    pub fn configure_peer(&mut self, peer: PeerAddress, channel: u8) -> Result<(), LinkError> {
        if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&channel) {
            return Err(LinkError::InvalidChannel(channel));
        }
        self.channel = channel;
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
        tracing::info!(%peer, channel, "link peer registered");
        Ok(())
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("link socket has no local address")
    }
}

impl TransportLink for UdpLink {
    fn send(&self, destination: PeerAddress, payload: &[u8]) -> Result<(), LinkError> {
        if payload.len() > LINK_MAX_PAYLOAD {
            return Err(LinkError::Oversize {
                len: payload.len(),
                max: LINK_MAX_PAYLOAD,
            });
        }
        if !self.peers.contains(&destination) {
            return Err(LinkError::UnknownPeer(destination));
        }

        let frame = LinkFrame {
            channel: self.channel,
            source: self.local,
            destination,
            payload,
        };
        let mut out = Vec::with_capacity(LINK_MAX_FRAME);
        frame.encode_into(&mut out).map_err(|_| LinkError::Oversize {
            len: payload.len(),
            max: LINK_MAX_PAYLOAD,
        })?;

        match self.socket.try_send_to(&out, self.remote) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LinkError::Busy),
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    fn max_payload(&self) -> usize {
        LINK_MAX_PAYLOAD
    }
}

/// Read frames off the link socket and hand each to the receive path.
pub async fn receive_loop(
    socket: Arc<UdpSocket>,
    path: ReceivePath,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    // One spare byte so an oversize datagram is seen as oversize, not cut.
    let mut buf = vec![0u8; LINK_MAX_FRAME + 1];

    tracing::info!(addr = ?socket.local_addr().ok(), "link receiver starting");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("link receiver shutting down");
                return Ok(());
            }

            r = socket.recv_from(&mut buf) => {
                let (len, from) = match r {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, "recv_from failed");
                        continue;
                    }
                };
                if let Delivery::Malformed(e) = path.deliver_raw(&buf[..len], Instant::now()) {
                    tracing::debug!(%from, len, error = %e, "malformed link frame");
                }
            }
        }
    }
}

/// Create a non-blocking UDP socket that may send to broadcast addresses
/// and share its port with other relays on the same host.
fn make_link_socket(bind: SocketAddr) -> Result<std::net::UdpSocket> {
    let domain = if bind.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    if bind.is_ipv4() {
        socket.set_broadcast(true).context("SO_BROADCAST")?;
    }
    socket.set_nonblocking(true).context("set_nonblocking")?;
    socket.bind(&bind.into()).context("bind()")?;

    Ok(socket.into())
}
